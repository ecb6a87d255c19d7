// Opportunity rubric for new listings: hard gates, then four fixed-tier axes
// summed to a score out of 100, then a minimum-score gate.
use serde::Serialize;
use shared::models::Ticker;
use std::cmp::Ordering;
use std::fmt;

use crate::config::ScanCriteria;

/// 24h quote volume at or above the threshold earns the points. Max 40.
const VOLUME_TIERS: [(f64, f64); 5] = [
    (1_000_000.0, 40.0),
    (500_000.0, 35.0),
    (200_000.0, 30.0),
    (100_000.0, 25.0),
    (50_000.0, 15.0),
];

/// Unit price at or below the threshold earns the points. Max 30.
const PRICE_TIERS: [(f64, f64); 8] = [
    (0.000001, 30.0),
    (0.00001, 28.0),
    (0.0001, 25.0),
    (0.001, 22.0),
    (0.01, 18.0),
    (0.1, 15.0),
    (1.0, 10.0),
    (2.0, 5.0),
];

/// 24h change at or above the lower bound earns the points; anything below the
/// last bound gets `MOMENTUM_FLOOR_POINTS`. Max 20.
const MOMENTUM_TIERS: [(f64, f64); 5] = [
    (50.0, 20.0),
    (20.0, 18.0),
    (0.0, 15.0),
    (-20.0, 18.0),
    (-50.0, 20.0),
];
const MOMENTUM_FLOOR_POINTS: f64 = 15.0;

/// 24h trade count at or above the threshold earns the points. Max 10.
const ACTIVITY_TIERS: [(u64, f64); 4] = [(50_000, 10.0), (10_000, 8.0), (5_000, 6.0), (1_000, 4.0)];

const VOLUME_CLAUSES: [(f64, &str); 2] = [
    (500_000.0, "excellent volume for a new listing"),
    (100_000.0, "healthy volume for a new entry"),
];
const PRICE_CLAUSES: [(f64, &str); 3] = [
    (0.00001, "very low entry price"),
    (0.001, "low entry price"),
    (0.1, "low-price entry opportunity"),
];
/// Half-open `[lower, upper)` change bands.
const MOMENTUM_CLAUSES: [(f64, f64, &str); 4] = [
    (20.0, f64::INFINITY, "strong upward momentum"),
    (0.0, 20.0, "stable new listing"),
    (-20.0, 0.0, "dip-buy opportunity"),
    (-50.0, -20.0, "deep-dip entry"),
];
const SCORE_CLAUSES: [(f64, &str); 3] = [
    (80.0, "excellent new-listing potential"),
    (60.0, "high new-listing potential"),
    (40.0, "good new-listing potential"),
];

/// Why a ticker was filtered out. Not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    VolumeBelowFloor { volume: f64, min: f64 },
    PriceOutOfBand { price: f64, min: f64, max: f64 },
    ChangeOutOfBand { change: f64, min: f64, max: f64 },
    ScoreBelowMinimum { score: f64, min: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::VolumeBelowFloor { volume, min } => write!(f, "volume {:.0} below {:.0}", volume, min),
            RejectReason::PriceOutOfBand { price, min, max } => write!(f, "price {} outside [{}, {}]", price, min, max),
            RejectReason::ChangeOutOfBand { change, min, max } => {
                write!(f, "24h change {:.2}% outside [{}, {}]", change, min, max)
            }
            RejectReason::ScoreBelowMinimum { score, min } => write!(f, "score {:.1} below {:.1}", score, min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub volume_points: f64,
    pub price_points: f64,
    pub momentum_points: f64,
    pub activity_points: f64,
    pub total: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Scored(ScoreCard),
    Rejected(RejectReason),
}

impl ScoreOutcome {
    pub fn card(self) -> Option<ScoreCard> {
        match self {
            ScoreOutcome::Scored(card) => Some(card),
            ScoreOutcome::Rejected(_) => None,
        }
    }
}

/// Apply the hard gates and, if they pass, the weighted rubric.
pub fn score_ticker(ticker: &Ticker, criteria: &ScanCriteria) -> ScoreOutcome {
    if let Some(reason) = hard_gate(ticker, criteria) {
        return ScoreOutcome::Rejected(reason);
    }

    let volume_points = volume_points(ticker.quote_volume);
    let price_points = price_points(ticker.last_price);
    let momentum_points = momentum_points(ticker.price_change_percent);
    let activity_points = activity_points(ticker.trade_count);
    let total = volume_points + price_points + momentum_points + activity_points;

    if total < criteria.min_score {
        return ScoreOutcome::Rejected(RejectReason::ScoreBelowMinimum { score: total, min: criteria.min_score });
    }

    ScoreOutcome::Scored(ScoreCard {
        volume_points,
        price_points,
        momentum_points,
        activity_points,
        total,
        rationale: rationale(ticker, total),
    })
}

// Negated comparisons so NaN inputs fail the gate.
fn hard_gate(ticker: &Ticker, criteria: &ScanCriteria) -> Option<RejectReason> {
    let price = ticker.last_price;
    if !(price >= criteria.min_price && price <= criteria.max_price) {
        return Some(RejectReason::PriceOutOfBand { price, min: criteria.min_price, max: criteria.max_price });
    }
    let volume = ticker.quote_volume;
    if !(volume >= criteria.min_volume) {
        return Some(RejectReason::VolumeBelowFloor { volume, min: criteria.min_volume });
    }
    let change = ticker.price_change_percent;
    if !(change >= criteria.min_price_change && change <= criteria.max_price_change) {
        return Some(RejectReason::ChangeOutOfBand {
            change,
            min: criteria.min_price_change,
            max: criteria.max_price_change,
        });
    }
    None
}

pub fn volume_points(volume: f64) -> f64 {
    VOLUME_TIERS
        .iter()
        .find(|&&(threshold, _)| volume >= threshold)
        .map_or(0.0, |&(_, points)| points)
}

pub fn price_points(price: f64) -> f64 {
    PRICE_TIERS
        .iter()
        .find(|&&(ceiling, _)| price <= ceiling)
        .map_or(0.0, |&(_, points)| points)
}

pub fn momentum_points(change: f64) -> f64 {
    MOMENTUM_TIERS
        .iter()
        .find(|&&(lower, _)| change >= lower)
        .map_or(MOMENTUM_FLOOR_POINTS, |&(_, points)| points)
}

pub fn activity_points(trades: u64) -> f64 {
    ACTIVITY_TIERS
        .iter()
        .find(|&&(threshold, _)| trades >= threshold)
        .map_or(0.0, |&(_, points)| points)
}

/// Clauses in fixed order: volume, price, momentum, score tier.
fn rationale(ticker: &Ticker, total: f64) -> String {
    let volume = VOLUME_CLAUSES
        .iter()
        .find(|&&(threshold, _)| ticker.quote_volume >= threshold)
        .map(|&(_, clause)| clause);
    let price = PRICE_CLAUSES
        .iter()
        .find(|&&(ceiling, _)| ticker.last_price <= ceiling)
        .map(|&(_, clause)| clause);
    let change = ticker.price_change_percent;
    let momentum = MOMENTUM_CLAUSES
        .iter()
        .find(|&&(lower, upper, _)| change >= lower && change < upper)
        .map(|&(_, _, clause)| clause);
    let tier = SCORE_CLAUSES
        .iter()
        .find(|&&(threshold, _)| total >= threshold)
        .map(|&(_, clause)| clause);

    [volume, price, momentum, tier].into_iter().flatten().collect::<Vec<_>>().join(", ")
}

/// Descending by score. Stable, so equal scores keep their input order.
pub fn rank_by_score<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(price: f64, volume: f64, change: f64, trades: u64) -> Ticker {
        Ticker {
            symbol: "TESTUSDT".to_string(),
            last_price: price,
            quote_volume: volume,
            price_change_percent: change,
            trade_count: trades,
        }
    }

    #[test]
    fn each_hard_gate_rejects_regardless_of_other_axes() {
        let criteria = ScanCriteria::default();
        // Every other axis at its best tier.
        let cases = [
            ticker(0.000001, 49_999.0, 60.0, 100_000),
            ticker(2.5, 5_000_000.0, 60.0, 100_000),
            ticker(0.0000001, 5_000_000.0, 60.0, 100_000),
            ticker(0.001, 5_000_000.0, -95.0, 100_000),
            ticker(0.001, 5_000_000.0, 1_500.0, 100_000),
            ticker(f64::NAN, 5_000_000.0, 10.0, 100_000),
        ];
        for t in cases {
            assert!(matches!(score_ticker(&t, &criteria), ScoreOutcome::Rejected(_)), "{:?}", t);
        }
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(volume_points(1_000_000.0), 40.0);
        assert_eq!(volume_points(999_999.0), 35.0);
        assert_eq!(volume_points(49_999.0), 0.0);
        assert_eq!(price_points(0.000001), 30.0);
        assert_eq!(price_points(0.0000011), 28.0);
        assert_eq!(price_points(2.0), 5.0);
        assert_eq!(price_points(2.01), 0.0);
        assert_eq!(activity_points(1_000), 4.0);
        assert_eq!(activity_points(999), 0.0);
    }

    #[test]
    fn momentum_rewards_rallies_and_moderate_dips() {
        assert_eq!(momentum_points(75.0), 20.0);
        assert_eq!(momentum_points(20.0), 18.0);
        assert_eq!(momentum_points(0.0), 15.0);
        assert_eq!(momentum_points(-10.0), 18.0);
        assert_eq!(momentum_points(-35.0), 20.0);
        assert_eq!(momentum_points(-70.0), 15.0);
        assert!(momentum_points(-35.0) > momentum_points(-70.0));
        assert!(momentum_points(-10.0) > momentum_points(5.0));
    }

    #[test]
    fn axis_maxima_sum_to_one_hundred() {
        let best = ticker(0.000001, 2_000_000.0, 60.0, 60_000);
        let card = score_ticker(&best, &ScanCriteria::default()).card().unwrap();
        assert_eq!(card.total, 100.0);
        assert_eq!(
            card.rationale,
            "excellent volume for a new listing, very low entry price, strong upward momentum, excellent new-listing potential"
        );
    }

    #[test]
    fn rationale_skips_axes_that_cross_no_clause() {
        // 15 + 5 + 15 + 0 = 35: no volume, price or score clause.
        let t = ticker(1.5, 60_000.0, 5.0, 10);
        let card = score_ticker(&t, &ScanCriteria::default()).card().unwrap();
        assert_eq!(card.total, 35.0);
        assert_eq!(card.rationale, "stable new listing");
    }

    #[test]
    fn min_score_gate_runs_after_scoring() {
        let criteria = ScanCriteria { min_score: 50.0, ..ScanCriteria::default() };
        let t = ticker(1.5, 60_000.0, 5.0, 10);
        assert_eq!(
            score_ticker(&t, &criteria),
            ScoreOutcome::Rejected(RejectReason::ScoreBelowMinimum { score: 35.0, min: 50.0 })
        );
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let mut items = vec![("a", 40.0), ("b", 70.0), ("c", 40.0), ("d", 70.0), ("e", 55.0)];
        rank_by_score(&mut items, |&(_, s)| s);
        let order: Vec<_> = items.iter().map(|&(n, _)| n).collect();
        assert_eq!(order, vec!["b", "d", "e", "a", "c"]);
    }
}
