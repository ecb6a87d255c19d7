// Follow-up to a scan: daily accumulation check on every kept symbol.
use futures::stream::{self, StreamExt};
use serde::Serialize;
use shared::models::SymbolProfile;

use crate::analysis::accumulation::{analyze, AccumulationAnalysis};
use crate::config::AccumulationSettings;
use crate::connectors::SharedMarketData;

#[derive(Debug, Clone, Serialize)]
pub struct AccumulationReport {
    /// One entry per analysed symbol, in scan rank order.
    pub analyses: Vec<AccumulationAnalysis>,
    /// Symbols left out for missing or short history.
    pub skipped: usize,
}

impl AccumulationReport {
    pub fn accumulate_count(&self) -> usize {
        self.analyses.iter().filter(|a| a.should_accumulate).count()
    }

    pub fn reverse_signal_count(&self) -> usize {
        self.analyses.iter().filter(|a| a.reverse_signal).count()
    }
}

pub struct AccumulationScanner {
    market: SharedMarketData,
    settings: AccumulationSettings,
    concurrency: usize,
}

impl AccumulationScanner {
    pub fn new(market: SharedMarketData, settings: AccumulationSettings, concurrency: usize) -> Self {
        AccumulationScanner { market, settings, concurrency: concurrency.max(1) }
    }

    async fn analyze_one(&self, profile: &SymbolProfile) -> Option<AccumulationAnalysis> {
        let symbol = profile.symbol.as_str();
        let candles = match self
            .market
            .fetch_candles(symbol, self.settings.candle_interval, self.settings.candle_count)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "No history for accumulation check");
                return None;
            }
        };
        if candles.len() < self.settings.min_candles as usize {
            tracing::info!(symbol, candles = candles.len(), min = self.settings.min_candles, "Too little history to analyse");
            return None;
        }
        analyze(profile, &candles, self.settings.candle_interval)
    }

    /// A failed or short fetch skips that symbol; it never aborts the batch.
    pub async fn analyze(&self, profiles: &[SymbolProfile]) -> AccumulationReport {
        tracing::info!(symbols = profiles.len(), "Running accumulation check");
        let results: Vec<Option<AccumulationAnalysis>> = stream::iter(profiles)
            .map(|profile| self.analyze_one(profile))
            .buffered(self.concurrency)
            .collect()
            .await;

        let skipped = results.iter().filter(|r| r.is_none()).count();
        let analyses: Vec<AccumulationAnalysis> = results.into_iter().flatten().collect();
        let report = AccumulationReport { analyses, skipped };
        tracing::info!(
            analysed = report.analyses.len(),
            skipped,
            accumulate = report.accumulate_count(),
            reverse_signals = report.reverse_signal_count(),
            "Accumulation check complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summary::test_support::flat_candles;
    use crate::connectors::paper::PaperExchange;
    use shared::models::Interval;
    use std::sync::Arc;

    fn profile(symbol: &str) -> SymbolProfile {
        SymbolProfile {
            symbol: symbol.to_string(),
            base_asset: symbol.trim_end_matches("USDT").to_string(),
            price: 0.5,
            volume_24h: 80_000.0,
            price_change_percent: 4.0,
            age_days: 20,
            score: 40.0,
            rationale: String::new(),
        }
    }

    #[tokio::test]
    async fn short_or_missing_history_is_skipped_in_rank_order() {
        let exchange = Arc::new(PaperExchange::new());
        exchange.add_candles("LONGUSDT", Interval::Day1, flat_candles(60, 0.5, 1_000.0)).await;
        exchange.add_candles("SHORTUSDT", Interval::Day1, flat_candles(12, 0.5, 1_000.0)).await;
        exchange.add_candles("ALSOUSDT", Interval::Day1, flat_candles(30, 0.5, 1_000.0)).await;

        let scanner = AccumulationScanner::new(exchange.clone(), AccumulationSettings::default(), 2);
        let profiles = [profile("LONGUSDT"), profile("SHORTUSDT"), profile("GONEUSDT"), profile("ALSOUSDT")];
        let report = scanner.analyze(&profiles).await;

        let symbols: Vec<&str> = report.analyses.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["LONGUSDT", "ALSOUSDT"]);
        assert_eq!(report.skipped, 2);
        // Flat history with flat volume triggers nothing.
        assert_eq!(report.accumulate_count(), 0);
        assert_eq!(report.reverse_signal_count(), 0);
        assert_eq!(exchange.candle_fetches(Interval::Day1).await, 4);
    }

    #[tokio::test]
    async fn unreachable_history_skips_every_symbol() {
        let exchange = Arc::new(PaperExchange::new());
        exchange.add_candles("LONGUSDT", Interval::Day1, flat_candles(60, 0.5, 1_000.0)).await;
        exchange.fail_candles(true).await;

        let report = AccumulationScanner::new(exchange, AccumulationSettings::default(), 4)
            .analyze(&[profile("LONGUSDT")])
            .await;
        assert!(report.analyses.is_empty());
        assert_eq!(report.skipped, 1);
    }
}
