// One grid iteration:
// [cancel] -> balances -> price -> candles -> advice -> plan -> orders -> report.
// Any collaborator failure aborts the iteration, tagged with its stage.
use chrono::Utc;
use std::time::Duration;

use super::execute_grid::submit_orders;
use super::{GridBot, GridCounts, IterationReport};
use crate::advisory::context::MarketContext;
use crate::analysis::summary::summarize;
use crate::error::{EngineError, Result, Stage, StageContext};
use crate::grid::SellPolicy;

impl GridBot {
    pub async fn run_iteration(&self, iteration: u64) -> Result<IterationReport> {
        let symbol = self.symbol.as_str();
        let started_at = Utc::now();
        tracing::info!(symbol, iteration, "Iteration started");

        let cancelled_orders = if self.bot.cancel_before_iteration {
            self.trading.cancel_open_orders(symbol).await.stage(Stage::CancelOrders, symbol)?
        } else {
            0
        };

        let balances = self.trading.fetch_balances().await.stage(Stage::FetchBalances, symbol)?;
        let quote_balance = balances.free(&self.quote_asset);
        let base_balance = balances.free(&self.base_asset);
        tracing::info!(symbol, quote = quote_balance, base = base_balance, "Balances");
        if quote_balance < self.bot.min_quote_balance && base_balance < self.bot.min_base_balance {
            return Err(EngineError::InsufficientFunds(format!(
                "{:.2} {} and {:.4} {} free, need {} {} or {} {}",
                quote_balance,
                self.quote_asset,
                base_balance,
                self.base_asset,
                self.bot.min_quote_balance,
                self.quote_asset,
                self.bot.min_base_balance,
                self.base_asset
            ))
            .at(Stage::FetchBalances, symbol));
        }

        let current_price = self.market.fetch_price(symbol).await.stage(Stage::FetchPrice, symbol)?;

        let candles = self
            .market
            .fetch_candles(symbol, self.bot.candle_interval, self.bot.candle_count)
            .await
            .stage(Stage::FetchCandles, symbol)?;
        let summary = summarize(&candles, self.bot.bucket_size, self.bot.max_buckets);
        tracing::debug!(symbol, candles = candles.len(), range_percent = summary.range_percent, "Candles summarised");

        let context = MarketContext {
            symbol,
            base_asset: &self.base_asset,
            interval: self.bot.candle_interval,
            candles: &candles,
            summary: &summary,
            recent_candles: self.bot.recent_candles,
            current_price,
            quote_balance,
            levels_per_side: self.grid.levels_per_side,
        }
        .render();
        let rec = self.advisor.advise(&context).await.stage(Stage::RequestAdvice, symbol)?;

        let misplaced_levels = rec.misplaced_levels(current_price);
        if misplaced_levels > 0 {
            tracing::warn!(symbol, misplaced_levels, current_price, "Advisor levels on the wrong side of the price");
        }
        if rec.valid_buy_levels() < self.grid.levels_per_side || rec.valid_sell_levels() < self.grid.levels_per_side {
            tracing::warn!(
                symbol,
                buys = rec.valid_buy_levels(),
                sells = rec.valid_sell_levels(),
                expected = self.grid.levels_per_side,
                "Advisor returned fewer levels than requested"
            );
        }

        let pause = Duration::from_millis(self.grid.order_pause_ms);
        let buys = self.allocator.plan_buys(&rec, quote_balance, &self.base_asset);
        tracing::info!(
            symbol,
            usable_budget = buys.usable_budget,
            per_order_budget = buys.per_order_budget,
            planned = buys.orders.len(),
            skipped = buys.skipped.len(),
            "Buy side planned"
        );
        for level in &buys.skipped {
            tracing::info!(symbol, level = level.level_index + 1, price = level.price, "Buy skipped, quantity too small");
        }
        let buy_submission = submit_orders(self.trading.as_ref(), symbol, &buys.orders, pause).await;

        // Balances may have moved while buys went out; the fresh read is authoritative.
        let balances = self.trading.fetch_balances().await.stage(Stage::FetchBalances, symbol)?;
        let free_base = balances.free(&self.base_asset);
        let sells = self
            .allocator
            .plan_sells(&rec, &buys, buy_submission.placed.len(), free_base, &self.base_asset);

        let (sell_submission, conditional) = match sells.policy {
            SellPolicy::Held { .. } => {
                (submit_orders(self.trading.as_ref(), symbol, &sells.orders, pause).await, Vec::new())
            }
            SellPolicy::Projected { expected_quantity } => {
                for intent in &sells.orders {
                    tracing::info!(
                        symbol,
                        level = intent.level_index + 1,
                        quantity = intent.quantity,
                        price = intent.price,
                        expected_quantity,
                        "Conditional sell, pending buy fills"
                    );
                }
                (Default::default(), sells.orders.clone())
            }
        };

        let counts = GridCounts {
            buys_placed: buy_submission.placed.len(),
            buys_skipped: buys.skipped.len(),
            buys_failed: buy_submission.failed.len(),
            sells_placed: sell_submission.placed.len(),
            sells_conditional: conditional.len(),
            sells_skipped: sells.skipped.len(),
            sells_failed: sell_submission.failed.len(),
        };
        if !counts.any_order() {
            return Err(EngineError::NoOrdersPlaced {
                symbol: symbol.to_string(),
                buys_skipped: counts.buys_skipped,
                sells_skipped: counts.sells_skipped,
                failed: counts.buys_failed + counts.sells_failed,
            }
            .at(Stage::ExecuteOrders, symbol));
        }

        let mut placed = buy_submission.placed;
        placed.extend(sell_submission.placed);
        tracing::info!(
            symbol,
            iteration,
            buys = counts.buys_placed,
            sells = counts.sells_placed,
            conditional = counts.sells_conditional,
            skipped = counts.buys_skipped + counts.sells_skipped,
            failed = counts.buys_failed + counts.sells_failed,
            "Iteration complete"
        );

        Ok(IterationReport {
            iteration,
            symbol: symbol.to_string(),
            started_at,
            cancelled_orders,
            quote_balance,
            current_price,
            support: rec.support,
            resistance: rec.resistance,
            range_low: summary.low,
            range_high: summary.high,
            range_percent: summary.range_percent,
            confidence: rec.confidence_label,
            risk: rec.risk_label,
            misplaced_levels,
            usable_budget: buys.usable_budget,
            per_order_budget: buys.per_order_budget,
            sell_policy: sells.policy,
            counts,
            placed,
            conditional,
        })
    }
}
