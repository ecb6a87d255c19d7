use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One fixed-duration OHLCV interval, as returned by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
}

impl Candle {
    /// A candle counts as "active" when anything traded during the interval.
    pub fn is_active(&self) -> bool {
        self.volume > 0.0
    }
}

/// Candle resolutions used by the scanner and the grid bot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Interval {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Month1,
}

impl Interval {
    /// Exchange wire code (`15m`, `1d`, `1M`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1w",
            Interval::Month1 => "1M",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1m" => Some(Interval::Minute1),
            "5m" => Some(Interval::Minute5),
            "15m" => Some(Interval::Minute15),
            "30m" => Some(Interval::Minute30),
            "1h" => Some(Interval::Hour1),
            "4h" => Some(Interval::Hour4),
            "1d" => Some(Interval::Day1),
            "1w" => Some(Interval::Week1),
            "1M" => Some(Interval::Month1),
            _ => None,
        }
    }

    /// Nominal length in minutes. Months are counted as 30 days.
    pub fn minutes(&self) -> u32 {
        match self {
            Interval::Minute1 => 1,
            Interval::Minute5 => 5,
            Interval::Minute15 => 15,
            Interval::Minute30 => 30,
            Interval::Hour1 => 60,
            Interval::Hour4 => 240,
            Interval::Day1 => 1_440,
            Interval::Week1 => 10_080,
            Interval::Month1 => 43_200,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Point-in-time 24h market summary for one symbol. Only used for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    pub quote_volume: f64,
    pub price_change_percent: f64,
    pub trade_count: u64,
}

/// A scored, age-checked scan candidate. Lives for one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolProfile {
    pub symbol: String,
    pub base_asset: String,
    pub price: f64,
    pub volume_24h: f64,
    pub price_change_percent: f64,
    pub age_days: u32,
    pub score: f64,
    pub rationale: String,
}

/// Parsed advisory result. Levels keep the order the advisor returned them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub analysis_text: String,
    pub support: f64,
    pub resistance: f64,
    pub buy_levels: Vec<f64>,
    pub sell_levels: Vec<f64>,
    pub confidence_label: String,
    pub risk_label: String,
    pub recommended_budget: String,
    pub max_position_size: String,
    pub gap_strategy: String,
}

impl Recommendation {
    /// Buy levels that sit at or above `current_price`, or sell levels at or below it.
    pub fn misplaced_levels(&self, current_price: f64) -> usize {
        let buys = self
            .buy_levels
            .iter()
            .filter(|&&p| p > 0.0 && p >= current_price)
            .count();
        let sells = self
            .sell_levels
            .iter()
            .filter(|&&p| p > 0.0 && p <= current_price)
            .count();
        buys + sells
    }

    pub fn valid_buy_levels(&self) -> usize {
        self.buy_levels.iter().filter(|&&p| p > 0.0).count()
    }

    pub fn valid_sell_levels(&self) -> usize {
        self.sell_levels.iter().filter(|&&p| p > 0.0).count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free balance per asset. A fresh snapshot is read before every decision that needs one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances(HashMap<String, f64>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, asset: &str, free: f64) {
        self.0.insert(asset.to_string(), free);
    }

    /// Free amount for `asset`; assets the account never held read as zero.
    pub fn free(&self, asset: &str) -> f64 {
        self.0.get(asset).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for Balances {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Balances(iter.into_iter().collect())
    }
}
