// Two-stage listing-age classifier.
//
// Stage 1 pulls a handful of coarse (monthly) candles. Enough active periods
// means the symbol is established and we stop there. Only ambiguous symbols pay
// for the longer daily query of stage 2. When neither stage yields data the
// young-symbol table answers instead, so classification never fails.
use serde::Serialize;
use std::sync::Arc;

use super::summary::count_active;
use crate::config::AgeSettings;
use crate::connectors::SharedMarketData;
use crate::data::age_table::YoungSymbolTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeClass {
    New,
    Established,
}

/// Which piece of evidence produced the age figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeSource {
    Coarse,
    Fine,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeEstimate {
    pub class: AgeClass,
    pub age_days: u32,
    pub source: AgeSource,
    /// `None` when the coarse query failed.
    pub active_coarse_periods: Option<u32>,
}

impl AgeEstimate {
    pub fn is_new(&self) -> bool {
        self.class == AgeClass::New
    }
}

#[derive(Clone)]
pub struct AgeClassifier {
    market: SharedMarketData,
    settings: AgeSettings,
    table: Arc<YoungSymbolTable>,
}

impl AgeClassifier {
    pub fn new(market: SharedMarketData, settings: AgeSettings, table: Arc<YoungSymbolTable>) -> Self {
        AgeClassifier { market, settings, table }
    }

    pub fn settings(&self) -> &AgeSettings {
        &self.settings
    }

    pub async fn classify(&self, symbol: &str) -> AgeEstimate {
        let coarse = self
            .market
            .fetch_candles(symbol, self.settings.coarse_interval, self.settings.coarse_lookback)
            .await;

        let active_coarse = match coarse {
            Ok(candles) => Some(count_active(&candles)),
            Err(e) => {
                tracing::debug!(symbol, error = %e, "Coarse age query failed, treating as ambiguous");
                None
            }
        };

        if let Some(active) = active_coarse {
            if active >= self.settings.coarse_threshold {
                // Report at least threshold x period length, never less.
                let days_per_period = (self.settings.coarse_interval.minutes() / 1_440).max(1);
                let estimate = AgeEstimate {
                    class: AgeClass::Established,
                    age_days: active * days_per_period,
                    source: AgeSource::Coarse,
                    active_coarse_periods: Some(active),
                };
                tracing::debug!(symbol, active, "Established by coarse stage");
                return estimate;
            }
        }

        let (age_days, source) = self.fine_age(symbol).await;
        let class = match self.settings.max_new_age_days {
            Some(max_days) if age_days > max_days => AgeClass::Established,
            _ => AgeClass::New,
        };
        tracing::debug!(symbol, age_days, ?source, ?class, "Classified by fine stage");
        AgeEstimate { class, age_days, source, active_coarse_periods: active_coarse }
    }

    /// Active fine-grained periods, or the table estimate when there are none.
    async fn fine_age(&self, symbol: &str) -> (u32, AgeSource) {
        match self
            .market
            .fetch_candles(symbol, self.settings.fine_interval, self.settings.fine_lookback)
            .await
        {
            Ok(candles) => {
                let active = count_active(&candles);
                if active > 0 {
                    return (active, AgeSource::Fine);
                }
                tracing::debug!(symbol, "No active fine periods, using pattern estimate");
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Fine age query failed, using pattern estimate");
            }
        }
        (self.table.estimate(symbol), AgeSource::Pattern)
    }
}
