// In-memory candle/ticker store backing the paper exchange.
use shared::models::{Candle, Interval, Ticker};
use std::collections::HashMap;

#[derive(Default)]
pub struct MarketDataStore {
    // Candles per symbol and interval, kept sorted by open time.
    candles: HashMap<String, HashMap<Interval, Vec<Candle>>>,
    tickers: Vec<Ticker>,
    prices: HashMap<String, f64>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candles(&mut self, symbol: &str, interval: Interval, new_candles: Vec<Candle>) {
        let series = self
            .candles
            .entry(symbol.to_string())
            .or_default()
            .entry(interval)
            .or_default();

        series.extend(new_candles);
        series.sort_by_key(|c| c.open_time);
        series.dedup_by_key(|c| c.open_time);
    }

    /// The last `limit` candles, oldest first. `None` when the symbol/interval was never loaded.
    pub fn latest_candles(&self, symbol: &str, interval: Interval, limit: usize) -> Option<Vec<Candle>> {
        self.candles
            .get(symbol)
            .and_then(|by_interval| by_interval.get(&interval))
            .map(|series| {
                let start = series.len().saturating_sub(limit);
                series[start..].to_vec()
            })
    }

    /// Replaces the ticker for the same symbol, preserving insertion order otherwise.
    pub fn upsert_ticker(&mut self, ticker: Ticker) {
        match self.tickers.iter_mut().find(|t| t.symbol == ticker.symbol) {
            Some(existing) => *existing = ticker,
            None => self.tickers.push(ticker),
        }
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    /// Explicit price, else last close of the finest loaded series, else the ticker's last price.
    pub fn price(&self, symbol: &str) -> Option<f64> {
        if let Some(&p) = self.prices.get(symbol) {
            return Some(p);
        }
        let from_candles = self.candles.get(symbol).and_then(|by_interval| {
            by_interval
                .iter()
                .min_by_key(|(interval, _)| interval.minutes())
                .and_then(|(_, series)| series.last())
                .map(|c| c.close)
        });
        from_candles.or_else(|| {
            self.tickers
                .iter()
                .find(|t| t.symbol == symbol)
                .map(|t| t.last_price)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summary::test_support::candle_at;

    fn ticker(symbol: &str, price: f64) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            last_price: price,
            quote_volume: 1.0,
            price_change_percent: 0.0,
            trade_count: 1,
        }
    }

    #[test]
    fn add_candles_sorts_and_dedups() {
        let mut store = MarketDataStore::new();
        store.add_candles("XUSDT", Interval::Minute15, vec![candle_at(2, 1.0, 1.0, 1.0, 1.2, 1.0), candle_at(0, 1.0, 1.0, 1.0, 1.0, 1.0)]);
        store.add_candles("XUSDT", Interval::Minute15, vec![candle_at(1, 1.0, 1.0, 1.0, 1.1, 1.0), candle_at(2, 9.0, 9.0, 9.0, 9.0, 9.0)]);

        let candles = store.latest_candles("XUSDT", Interval::Minute15, 10).unwrap();
        assert_eq!(candles.len(), 3);
        assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
        assert_eq!(candles[2].close, 1.2);
    }

    #[test]
    fn latest_candles_takes_the_tail() {
        let mut store = MarketDataStore::new();
        store.add_candles("XUSDT", Interval::Day1, (0..10).map(|i| candle_at(i, 1.0, 1.0, 1.0, i as f64, 1.0)).collect());
        let tail = store.latest_candles("XUSDT", Interval::Day1, 3).unwrap();
        assert_eq!(tail.iter().map(|c| c.close).collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
        assert!(store.latest_candles("XUSDT", Interval::Month1, 3).is_none());
        assert!(store.latest_candles("YUSDT", Interval::Day1, 3).is_none());
    }

    #[test]
    fn price_prefers_explicit_then_finest_candles_then_ticker() {
        let mut store = MarketDataStore::new();
        store.upsert_ticker(ticker("XUSDT", 0.5));
        assert_eq!(store.price("XUSDT"), Some(0.5));

        store.add_candles("XUSDT", Interval::Day1, vec![candle_at(0, 1.0, 1.0, 1.0, 0.7, 1.0)]);
        store.add_candles("XUSDT", Interval::Minute15, vec![candle_at(0, 1.0, 1.0, 1.0, 0.6, 1.0)]);
        assert_eq!(store.price("XUSDT"), Some(0.6));

        store.set_price("XUSDT", 0.65);
        assert_eq!(store.price("XUSDT"), Some(0.65));
        assert_eq!(store.price("NOPEUSDT"), None);
    }

    #[test]
    fn upsert_ticker_replaces_in_place() {
        let mut store = MarketDataStore::new();
        store.upsert_ticker(ticker("AUSDT", 1.0));
        store.upsert_ticker(ticker("BUSDT", 2.0));
        store.upsert_ticker(ticker("AUSDT", 3.0));
        let symbols: Vec<_> = store.tickers().iter().map(|t| (t.symbol.as_str(), t.last_price)).collect();
        assert_eq!(symbols, vec![("AUSDT", 3.0), ("BUSDT", 2.0)]);
    }
}
