// Accumulation check for freshly listed symbols.
//
// Reads a daily window for three things: the SMA 7/14/21/30 trend stack, where
// the close sits against the 30-day and 7-day ranges, and whether the last
// candle's volume stands out. A fixed decision ladder turns them into an
// action with price targets.
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{Candle, Interval, SymbolProfile};
use shared::utils::{average, max_of, min_of};
use std::fmt;

use super::sma::Sma;

const DAILY_WINDOW: usize = 30;
const WEEKLY_WINDOW: usize = 7;
const VOLUME_WINDOW: usize = 21;
/// Last volume above this multiple of the 21-candle average counts as a surge.
const VOLUME_SURGE: f64 = 1.2;

const BREAKOUT_FACTOR: f64 = 0.98;
const DAILY_SUPPORT_FACTOR: f64 = 1.02;
const WEEKLY_SUPPORT_FACTOR: f64 = 1.01;

const VERY_NEW_DAYS: u32 = 15;
const NEW_DAYS: u32 = 30;

const ACCUMULATION_BAND: (f64, f64) = (0.95, 1.1);
const STOP_LOSS_FACTOR: f64 = 0.85;
const PROFIT_MULTIPLES: [f64; 3] = [1.3, 1.8, 2.5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Low,
    Medium,
    High,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grade::Low => "low",
            Grade::Medium => "medium",
            Grade::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Accumulate,
    Wait,
    Avoid,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Accumulate => "accumulate",
            Action::Wait => "wait",
            Action::Avoid => "avoid",
        })
    }
}

/// Boolean reading of one window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Signals {
    /// SMA7 above SMA14.
    pub short_trend: bool,
    /// SMA14 above SMA21.
    pub medium_trend: bool,
    /// SMA21 above SMA30.
    pub long_trend: bool,
    pub daily_breakout: bool,
    pub daily_support: bool,
    pub weekly_support: bool,
    pub volume_surge: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub should_accumulate: bool,
    pub confidence: Grade,
    pub risk: Grade,
    pub action: Action,
}

/// First matching rung wins.
pub fn decide(age_days: u32, signals: &Signals) -> Decision {
    let s = signals;
    let (should_accumulate, confidence, risk, action) =
        if age_days <= VERY_NEW_DAYS && s.daily_support && s.volume_surge && s.short_trend {
            (true, Grade::High, Grade::Medium, Action::Accumulate)
        } else if age_days <= NEW_DAYS && s.medium_trend && s.volume_surge && !s.daily_breakout {
            (true, Grade::Medium, Grade::Medium, Action::Accumulate)
        } else if s.daily_breakout && s.volume_surge && s.long_trend {
            (false, Grade::Medium, Grade::Low, Action::Wait)
        } else if s.weekly_support && s.volume_surge {
            (true, Grade::Medium, Grade::Medium, Action::Accumulate)
        } else {
            (false, Grade::Low, Grade::High, Action::Avoid)
        };
    Decision { should_accumulate, confidence, risk, action }
}

/// Heavy 24h drop into support on rising volume.
pub fn reverse_signal(price_change_percent: f64, signals: &Signals) -> bool {
    signals.volume_surge
        && ((signals.daily_support && price_change_percent < -10.0)
            || (signals.weekly_support && price_change_percent < -15.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationAnalysis {
    pub symbol: String,
    pub price: f64,
    pub age_days: u32,
    pub should_accumulate: bool,
    pub reverse_signal: bool,
    pub confidence: Grade,
    pub risk_level: Grade,
    pub recommended_action: Action,
    /// `[low, high]` entry band around the 30-day low.
    pub accumulation_range: [f64; 2],
    pub stop_loss: f64,
    pub profit_targets: [f64; 3],
    pub technical_summary: String,
    pub market_sentiment: String,
    pub volume_analysis: String,
    pub price_action: String,
    pub time_frame: String,
    pub last_update: DateTime<Utc>,
}

/// Analyse `candles` (chronological) for `profile`. `None` for an empty window.
pub fn analyze(profile: &SymbolProfile, candles: &[Candle], time_frame: Interval) -> Option<AccumulationAnalysis> {
    let last = candles.last()?;
    let price = last.close;

    let daily = &candles[candles.len().saturating_sub(DAILY_WINDOW)..];
    let weekly = &candles[candles.len().saturating_sub(WEEKLY_WINDOW)..];
    let (daily_high, daily_low) = window_range(daily);
    let (weekly_high, weekly_low) = window_range(weekly);

    let volumes: Vec<f64> = candles[candles.len().saturating_sub(VOLUME_WINDOW)..].iter().map(|c| c.volume).collect();
    let avg_volume = average(&volumes);
    let recent_volume = last.volume;

    let ma = |period| Sma::new(period).latest(candles);
    let above = |a: Option<f64>, b: Option<f64>| matches!((a, b), (Some(a), Some(b)) if a > b);
    let (ma7, ma14, ma21, ma30) = (ma(7), ma(14), ma(21), ma(30));

    let signals = Signals {
        short_trend: above(ma7, ma14),
        medium_trend: above(ma14, ma21),
        long_trend: above(ma21, ma30),
        daily_breakout: price >= daily_high * BREAKOUT_FACTOR,
        daily_support: price <= daily_low * DAILY_SUPPORT_FACTOR,
        weekly_support: price <= weekly_low * WEEKLY_SUPPORT_FACTOR,
        volume_surge: recent_volume > avg_volume * VOLUME_SURGE,
    };
    let decision = decide(profile.age_days, &signals);

    Some(AccumulationAnalysis {
        symbol: profile.symbol.clone(),
        price,
        age_days: profile.age_days,
        should_accumulate: decision.should_accumulate,
        reverse_signal: reverse_signal(profile.price_change_percent, &signals),
        confidence: decision.confidence,
        risk_level: decision.risk,
        recommended_action: decision.action,
        accumulation_range: [daily_low * ACCUMULATION_BAND.0, daily_low * ACCUMULATION_BAND.1],
        stop_loss: daily_low * STOP_LOSS_FACTOR,
        profit_targets: PROFIT_MULTIPLES.map(|m| price * m),
        technical_summary: technical_summary(profile.age_days, &signals),
        market_sentiment: market_sentiment(profile.price_change_percent, signals.volume_surge).to_string(),
        volume_analysis: volume_analysis(recent_volume, avg_volume).to_string(),
        price_action: price_action(price, (daily_high, daily_low), (weekly_high, weekly_low)).to_string(),
        time_frame: time_frame.code().to_string(),
        last_update: Utc::now(),
    })
}

fn window_range(window: &[Candle]) -> (f64, f64) {
    let highs: Vec<f64> = window.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = window.iter().map(|c| c.low).collect();
    (max_of(&highs).unwrap_or(0.0), min_of(&lows).unwrap_or(0.0))
}

fn technical_summary(age_days: u32, s: &Signals) -> String {
    let mut parts = vec![match (s.short_trend, s.medium_trend) {
        (true, true) => "strong uptrend",
        (true, false) => "short-term uptrend",
        (false, true) => "medium-term uptrend",
        (false, false) => "downtrend",
    }];
    if s.daily_support {
        parts.push("near daily support");
    }
    if s.volume_surge {
        parts.push("volume confirms the move");
    }
    if age_days <= VERY_NEW_DAYS {
        parts.push("very new listing");
    } else if age_days <= NEW_DAYS {
        parts.push("new listing");
    }
    parts.join(", ")
}

fn market_sentiment(price_change_percent: f64, volume_surge: bool) -> &'static str {
    match price_change_percent {
        c if c > 10.0 && volume_surge => "very strong",
        c if c > 0.0 && volume_surge => "positive with volume",
        c if c < -20.0 => "very weak",
        c if c < 0.0 => "weak",
        _ => "neutral",
    }
}

fn volume_analysis(current: f64, avg: f64) -> &'static str {
    let ratio = if avg > 0.0 { current / avg } else { 1.0 };
    match ratio {
        r if r > 2.0 => "abnormally high volume",
        r if r > 1.5 => "above-normal volume",
        r if r > 1.2 => "rising volume",
        r if r < 0.5 => "very low volume",
        _ => "normal volume",
    }
}

/// Position of `price` within a `(high, low)` range, 0.5 for a flat range.
fn position(price: f64, (high, low): (f64, f64)) -> f64 {
    if high > low {
        (price - low) / (high - low)
    } else {
        0.5
    }
}

fn price_action(price: f64, daily: (f64, f64), weekly: (f64, f64)) -> &'static str {
    let d = position(price, daily);
    let w = position(price, weekly);
    if d > 0.8 && w > 0.7 {
        "near daily and weekly highs"
    } else if d < 0.2 && w < 0.3 {
        "near daily and weekly lows"
    } else if d > 0.6 {
        "upper daily range"
    } else if d < 0.4 {
        "lower daily range"
    } else if w > 0.6 {
        "upper weekly range"
    } else if w < 0.4 {
        "lower weekly range"
    } else {
        "mid daily structure"
    }
}
