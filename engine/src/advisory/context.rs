// Market context handed to the advisor as free text.
use shared::models::{Candle, Interval};
use std::fmt::Write;

use crate::analysis::summary::CandleSummary;

pub struct MarketContext<'a> {
    pub symbol: &'a str,
    pub base_asset: &'a str,
    pub interval: Interval,
    pub candles: &'a [Candle],
    pub summary: &'a CandleSummary,
    /// Trailing candles listed one per line.
    pub recent_candles: usize,
    pub current_price: f64,
    pub quote_balance: f64,
    pub levels_per_side: usize,
}

fn window_label(interval: Interval, candles: usize) -> String {
    let minutes = interval.minutes() as u64 * candles as u64;
    if minutes >= 2 * 1_440 && minutes % 1_440 == 0 {
        format!("{} days", minutes / 1_440)
    } else if minutes >= 60 {
        format!("{} hours", minutes / 60)
    } else {
        format!("{} minutes", minutes)
    }
}

impl MarketContext<'_> {
    pub fn render(&self) -> String {
        // Writing into a String cannot fail.
        let mut out = String::new();
        let window = window_label(self.interval, self.candles.len());
        let n = self.levels_per_side;

        let _ = writeln!(
            out,
            "{} candlestick data for {} (latest {}, {} candles):\n",
            self.interval,
            self.symbol,
            window,
            self.candles.len()
        );

        if self.summary.candles > 0 {
            let _ = writeln!(out, "Summary:");
            let _ = writeln!(
                out,
                "  High: {:.8} | Low: {:.8} | Range: {:.2}%",
                self.summary.high, self.summary.low, self.summary.range_percent
            );
            let _ = writeln!(
                out,
                "  Total volume: {:.0} {} | Avg volume: {:.0} {}\n",
                self.summary.total_volume, self.base_asset, self.summary.avg_volume, self.base_asset
            );
        }

        let start = self.candles.len().saturating_sub(self.recent_candles);
        let recent = &self.candles[start..];
        let _ = writeln!(out, "Recent detail (latest {} candles):", recent.len());
        for (i, c) in recent.iter().enumerate() {
            let _ = writeln!(
                out,
                "Candle {} ({}): O:{:.8} H:{:.8} L:{:.8} C:{:.8} V:{:.0}",
                i + 1,
                c.open_time.format("%b %-d %H:%M"),
                c.open,
                c.high,
                c.low,
                c.close,
                c.volume
            );
        }

        if !self.summary.periods.is_empty() {
            let _ = writeln!(out, "\nPeriod analysis:");
            for (i, p) in self.summary.periods.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "Period {} ({}): {:.8} -> {:.8} ({:+.2}%) Vol: {:.0}",
                    i + 1,
                    p.start_time.format("%b %-d %H:%M"),
                    p.open,
                    p.close,
                    p.change_percent,
                    p.volume
                );
            }
        }

        let _ = write!(
            out,
            "\nCurrent {base} price: {price:.8}\n\
             Available quote balance: {balance:.2}\n\n\
             As a cryptocurrency trader and risk manager, analyse this {window} of {symbol} data and \
             provide EXACTLY {n} BUY levels below the current price and EXACTLY {n} SELL levels above it.\n\
             Space the levels from the observed volatility and volume clusters, and keep every \
             buy-to-sell gap above 0.3% so the 0.2% round-trip fee is covered.\n\n\
             Respond with a single JSON object:\n\
             {{\n\
             \x20 \"analysis\": \"short analysis of the window\",\n\
             \x20 \"support\": strongest_support_price,\n\
             \x20 \"resistance\": strongest_resistance_price,\n\
             \x20 \"buyLevels\": [{n} buy prices below current price],\n\
             \x20 \"sellLevels\": [{n} sell prices above current price],\n\
             \x20 \"confidence\": \"High/Medium/Low\",\n\
             \x20 \"riskLevel\": \"Low/Medium/High\",\n\
             \x20 \"maxPositionSize\": \"percentage like 20%\",\n\
             \x20 \"recommendedBudget\": total_quote_budget,\n\
             \x20 \"gapStrategy\": \"how the gaps were chosen\"\n\
             }}\n",
            base = self.base_asset,
            price = self.current_price,
            balance = self.quote_balance,
            window = window,
            symbol = self.symbol,
            n = n,
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summary::summarize;
    use crate::analysis::summary::test_support::{candle_at, flat_candles};

    #[test]
    fn renders_summary_recent_detail_and_periods() {
        let candles: Vec<Candle> = (0..144)
            .map(|i| {
                let p = 0.02 + (i % 10) as f64 * 0.0001;
                candle_at(i, p, p + 0.0002, p - 0.0002, p + 0.0001, 1_000.0)
            })
            .collect();
        let summary = summarize(&candles, 24, 6);
        let text = MarketContext {
            symbol: "PEPEUSDT",
            base_asset: "PEPE",
            interval: Interval::Minute15,
            candles: &candles,
            summary: &summary,
            recent_candles: 16,
            current_price: 0.0205,
            quote_balance: 100.0,
            levels_per_side: 5,
        }
        .render();

        assert!(text.starts_with("15m candlestick data for PEPEUSDT (latest 36 hours, 144 candles)"));
        assert!(text.contains("Total volume: 144000 PEPE"));
        assert!(text.contains("Candle 16 ("));
        assert!(!text.contains("Candle 17 ("));
        assert!(text.contains("Period 6 ("));
        assert!(!text.contains("Period 7 ("));
        assert!(text.contains("Current PEPE price: 0.02050000"));
        assert!(text.contains("EXACTLY 5 BUY levels"));
        assert!(text.contains("\"buyLevels\""));
    }

    #[test]
    fn short_window_has_no_period_section() {
        let candles = flat_candles(10, 1.0, 5.0);
        let summary = summarize(&candles, 24, 6);
        let text = MarketContext {
            symbol: "XUSDT",
            base_asset: "X",
            interval: Interval::Minute15,
            candles: &candles,
            summary: &summary,
            recent_candles: 16,
            current_price: 1.0,
            quote_balance: 10.0,
            levels_per_side: 5,
        }
        .render();

        assert!(text.contains("Range: 0.00%"));
        assert!(text.contains("Recent detail (latest 10 candles)"));
        assert!(!text.contains("Period analysis"));
    }

    #[test]
    fn window_labels() {
        assert_eq!(window_label(Interval::Minute15, 144), "36 hours");
        assert_eq!(window_label(Interval::Day1, 35), "35 days");
        assert_eq!(window_label(Interval::Minute15, 2), "30 minutes");
    }
}
