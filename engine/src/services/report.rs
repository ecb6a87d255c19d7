// Operator-facing text for scan results, accumulation checks and grid iterations.
use std::fmt;

use super::accumulation::AccumulationReport;
use super::grid_bot::IterationReport;
use super::scanner::ScanReport;
use crate::grid::SellPolicy;

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.profiles.is_empty() {
            return writeln!(f, "No new listings matched ({} tickers scanned).", self.stats.tickers);
        }
        writeln!(
            f,
            "{:>3}  {:<14} {:>14} {:>14} {:>9} {:>5} {:>6}  {}",
            "#", "SYMBOL", "PRICE", "VOLUME 24H", "CHANGE", "AGE", "SCORE", "RATIONALE"
        )?;
        for (i, p) in self.profiles.iter().enumerate() {
            writeln!(
                f,
                "{:>3}  {:<14} {:>14.8} {:>14.0} {:>+8.2}% {:>4}d {:>6.1}  {}",
                i + 1,
                p.symbol,
                p.price,
                p.volume_24h,
                p.price_change_percent,
                p.age_days,
                p.score,
                p.rationale
            )?;
        }
        writeln!(
            f,
            "\n{} kept of {} tickers ({} excluded, {} rejected, {} established)",
            self.stats.kept, self.stats.tickers, self.stats.excluded, self.stats.rejected, self.stats.established
        )
    }
}

impl fmt::Display for AccumulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accumulation check")?;
        writeln!(f, "  Analysed:        {} ({} skipped for history)", self.analyses.len(), self.skipped)?;
        writeln!(f, "  Accumulate:      {}", self.accumulate_count())?;
        writeln!(f, "  Reverse signals: {}", self.reverse_signal_count())?;
        for a in self.analyses.iter().filter(|a| a.should_accumulate || a.reverse_signal) {
            writeln!(
                f,
                "    {}: {} (confidence {}, risk {}), range {:.8} - {:.8}, stop {:.8}",
                a.symbol,
                a.recommended_action,
                a.confidence,
                a.risk_level,
                a.accumulation_range[0],
                a.accumulation_range[1],
                a.stop_loss
            )?;
            if a.reverse_signal {
                writeln!(f, "      reversal signal")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for IterationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        let levels = c.buys_placed + c.buys_skipped + c.buys_failed;
        writeln!(f, "{} grid, iteration #{} ({})", self.symbol, self.iteration, self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "  Price:       {:.8}", self.current_price)?;
        writeln!(f, "  Support:     {:.8}   Resistance: {:.8}", self.support, self.resistance)?;
        writeln!(
            f,
            "  Range:       {:.8} - {:.8} ({:.2}%)",
            self.range_low, self.range_high, self.range_percent
        )?;
        if !self.confidence.is_empty() || !self.risk.is_empty() {
            writeln!(f, "  Confidence:  {}   Risk: {}", self.confidence, self.risk)?;
        }
        writeln!(
            f,
            "  Budget:      {:.2} usable of {:.2}, {:.2} per buy",
            self.usable_budget, self.quote_balance, self.per_order_budget
        )?;
        if self.cancelled_orders > 0 {
            writeln!(f, "  Cancelled:   {} open orders", self.cancelled_orders)?;
        }
        writeln!(
            f,
            "  Buys:        {}/{} placed, {} skipped, {} failed",
            c.buys_placed, levels, c.buys_skipped, c.buys_failed
        )?;
        match self.sell_policy {
            SellPolicy::Held { free_base } => writeln!(
                f,
                "  Sells:       {} placed from {:.4} held, {} skipped, {} failed",
                c.sells_placed, free_base, c.sells_skipped, c.sells_failed
            )?,
            SellPolicy::Projected { expected_quantity } => writeln!(
                f,
                "  Sells:       {} conditional on {:.4} expected fills, {} skipped",
                c.sells_conditional, expected_quantity, c.sells_skipped
            )?,
        }
        if self.misplaced_levels > 0 {
            writeln!(f, "  Warning:     {} advisory levels on the wrong side of the price", self.misplaced_levels)?;
        }
        for order in &self.placed {
            writeln!(
                f,
                "    {} {}: {} @ {:.8} (id {})",
                order.intent.side,
                order.intent.level_index + 1,
                order.intent.quantity,
                order.intent.price,
                order.order_id
            )?;
        }
        for intent in &self.conditional {
            writeln!(
                f,
                "    {} {}: {} @ {:.8} (conditional, pending buy fills)",
                intent.side,
                intent.level_index + 1,
                intent.quantity,
                intent.price
            )?;
        }
        Ok(())
    }
}
