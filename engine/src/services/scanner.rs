// New-listing scan: tickers -> pre-filter -> score -> age check -> rank.
use futures::stream::{self, StreamExt};
use serde::Serialize;
use shared::models::{SymbolProfile, Ticker};
use shared::utils::base_asset;
use std::time::Duration;

use crate::analysis::age::AgeClassifier;
use crate::analysis::scoring::{rank_by_score, score_ticker, ScoreCard, ScoreOutcome};
use crate::config::ScanCriteria;
use crate::connectors::SharedMarketData;
use crate::error::{Result, Stage, StageContext};

/// How many tickers fell out at each step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanStats {
    pub tickers: usize,
    pub excluded: usize,
    pub rejected: usize,
    pub established: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub profiles: Vec<SymbolProfile>,
    pub stats: ScanStats,
}

pub struct Scanner {
    market: SharedMarketData,
    criteria: ScanCriteria,
    classifier: AgeClassifier,
}

impl Scanner {
    pub fn new(market: SharedMarketData, criteria: ScanCriteria, classifier: AgeClassifier) -> Self {
        Scanner { market, criteria, classifier }
    }

    fn is_candidate(&self, ticker: &Ticker) -> bool {
        ticker.symbol.ends_with(&self.criteria.quote_asset)
            && ticker.symbol.len() > self.criteria.quote_asset.len()
            && !self.criteria.excluded_symbols.iter().any(|s| s == &ticker.symbol)
    }

    pub async fn scan(&self) -> Result<ScanReport> {
        let tickers = self.market.fetch_tickers().await.stage(Stage::FetchTickers, "*")?;
        let mut stats = ScanStats { tickers: tickers.len(), ..Default::default() };
        tracing::info!(tickers = tickers.len(), "Scanning for new listings");

        let mut scored: Vec<(Ticker, ScoreCard)> = Vec::new();
        for ticker in tickers {
            if !self.is_candidate(&ticker) {
                stats.excluded += 1;
                continue;
            }
            match score_ticker(&ticker, &self.criteria) {
                ScoreOutcome::Scored(card) => scored.push((ticker, card)),
                ScoreOutcome::Rejected(reason) => {
                    tracing::trace!(symbol = %ticker.symbol, %reason, "Rejected");
                    stats.rejected += 1;
                }
            }
        }
        tracing::debug!(candidates = scored.len(), "Classifying listing age");

        let pace = Duration::from_millis(self.criteria.pace_ms);
        let classified: Vec<_> = stream::iter(scored)
            .map(|(ticker, card)| async move {
                if !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
                let age = self.classifier.classify(&ticker.symbol).await;
                (ticker, card, age)
            })
            .buffered(self.criteria.concurrency.max(1))
            .collect()
            .await;

        let mut profiles: Vec<SymbolProfile> = Vec::new();
        for (ticker, card, age) in classified {
            if !age.is_new() {
                stats.established += 1;
                continue;
            }
            profiles.push(SymbolProfile {
                base_asset: base_asset(&ticker.symbol, &self.criteria.quote_asset).to_string(),
                symbol: ticker.symbol,
                price: ticker.last_price,
                volume_24h: ticker.quote_volume,
                price_change_percent: ticker.price_change_percent,
                age_days: age.age_days,
                score: card.total,
                rationale: card.rationale,
            });
        }

        rank_by_score(&mut profiles, |p| p.score);
        profiles.truncate(self.criteria.max_results);
        stats.kept = profiles.len();

        tracing::info!(
            kept = stats.kept,
            excluded = stats.excluded,
            rejected = stats.rejected,
            established = stats.established,
            "Scan complete"
        );
        Ok(ScanReport { profiles, stats })
    }
}
