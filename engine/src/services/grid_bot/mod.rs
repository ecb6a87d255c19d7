// Per-symbol grid bot: one iteration per tick, each iteration independent.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::config::{BotSettings, GridSettings};
use crate::connectors::{OrderId, SharedAdvisor, SharedMarketData, SharedTrading};
use crate::grid::{GridAllocator, OrderIntent, SellPolicy};

pub mod execute_grid;
pub mod run_iteration;

/// Outcome counts for one grid. Skipped levels are not failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridCounts {
    pub buys_placed: usize,
    pub buys_skipped: usize,
    pub buys_failed: usize,
    pub sells_placed: usize,
    pub sells_conditional: usize,
    pub sells_skipped: usize,
    pub sells_failed: usize,
}

impl GridCounts {
    /// At least one order placed or planned on either side.
    pub fn any_order(&self) -> bool {
        self.buys_placed + self.sells_placed + self.sells_conditional > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub intent: OrderIntent,
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationReport {
    pub iteration: u64,
    pub symbol: String,
    pub started_at: DateTime<Utc>,
    pub cancelled_orders: usize,
    pub quote_balance: f64,
    pub current_price: f64,
    pub support: f64,
    pub resistance: f64,
    pub range_low: f64,
    pub range_high: f64,
    pub range_percent: f64,
    pub confidence: String,
    pub risk: String,
    /// Advisory levels on the wrong side of the current price.
    pub misplaced_levels: usize,
    pub usable_budget: f64,
    pub per_order_budget: f64,
    pub sell_policy: SellPolicy,
    pub counts: GridCounts,
    pub placed: Vec<PlacedOrder>,
    /// Sells sized against anticipated fills. Reported only, never submitted.
    pub conditional: Vec<OrderIntent>,
}

pub struct GridBot {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    market: SharedMarketData,
    trading: SharedTrading,
    advisor: SharedAdvisor,
    allocator: GridAllocator,
    grid: GridSettings,
    bot: BotSettings,
}

impl GridBot {
    pub fn new(
        symbol: &str,
        quote_asset: &str,
        market: SharedMarketData,
        trading: SharedTrading,
        advisor: SharedAdvisor,
        grid: GridSettings,
        bot: BotSettings,
    ) -> Self {
        GridBot {
            symbol: symbol.to_string(),
            base_asset: shared::utils::base_asset(symbol, quote_asset).to_string(),
            quote_asset: quote_asset.to_string(),
            market,
            trading,
            advisor,
            allocator: GridAllocator::new(&grid),
            grid,
            bot,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// First iteration immediately, then one per interval until `shutdown`
    /// resolves. A running iteration is never interrupted; a failed one is
    /// logged and the next tick starts fresh. Returns the iterations run.
    pub async fn run_continuous<F>(&self, shutdown: F, mut on_report: impl FnMut(&IterationReport)) -> u64
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_secs(self.bot.interval_minutes.max(1) * 60);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(symbol = %self.symbol, interval_minutes = self.bot.interval_minutes, "Starting continuous grid bot");
        let mut iteration = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(symbol = %self.symbol, iterations = iteration, "Shutdown requested, stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }

            iteration += 1;
            match self.run_iteration(iteration).await {
                Ok(report) => on_report(&report),
                Err(e) => tracing::error!(symbol = %self.symbol, iteration, stage = ?e.stage(), error = %e, "Iteration failed"),
            }
        }
        iteration
    }
}
