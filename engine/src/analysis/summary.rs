// Candle window reduction: global range/volume plus fixed-size period buckets.
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::Candle;
use shared::utils::{average, max_of, min_of, percent_change};

/// Open-to-close move and traded volume of one bucket of consecutive candles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodChange {
    pub start_time: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub change_percent: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleSummary {
    pub candles: usize,
    pub high: f64,
    pub low: f64,
    /// `(high - low) / low * 100`, 0 for flat or empty windows.
    pub range_percent: f64,
    pub total_volume: f64,
    pub avg_volume: f64,
    pub periods: Vec<PeriodChange>,
}

impl CandleSummary {
    fn empty() -> Self {
        CandleSummary {
            candles: 0,
            high: 0.0,
            low: 0.0,
            range_percent: 0.0,
            total_volume: 0.0,
            avg_volume: 0.0,
            periods: Vec::new(),
        }
    }
}

/// Reduce `candles` (chronological) into a summary. Only complete buckets of
/// `bucket_size` candles are emitted, at most `max_buckets` of them; a
/// `bucket_size` of zero disables bucketing.
pub fn summarize(candles: &[Candle], bucket_size: usize, max_buckets: usize) -> CandleSummary {
    if candles.is_empty() {
        return CandleSummary::empty();
    }

    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let high = max_of(&highs).unwrap_or(0.0);
    let low = min_of(&lows).unwrap_or(0.0);
    let total_volume: f64 = volumes.iter().sum();

    let range_percent = if high > low && low > 0.0 { (high - low) / low * 100.0 } else { 0.0 };

    let periods = if bucket_size == 0 {
        Vec::new()
    } else {
        candles
            .chunks_exact(bucket_size)
            .take(max_buckets)
            .map(|bucket| {
                let open = bucket[0].open;
                let close = bucket[bucket.len() - 1].close;
                PeriodChange {
                    start_time: bucket[0].open_time,
                    open,
                    close,
                    change_percent: percent_change(open, close),
                    volume: bucket.iter().map(|c| c.volume).sum(),
                }
            })
            .collect()
    };

    CandleSummary {
        candles: candles.len(),
        high,
        low,
        range_percent,
        total_volume,
        avg_volume: average(&volumes),
        periods,
    }
}

/// Number of candles in which anything traded.
pub fn count_active(candles: &[Candle]) -> u32 {
    candles.iter().filter(|c| c.is_active()).count() as u32
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use shared::models::Candle;

    /// Candles 15 minutes apart starting at a fixed instant.
    pub fn candle_at(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(15 * index as i64);
        Candle {
            open_time: start,
            open,
            high,
            low,
            close,
            volume,
            close_time: start + Duration::minutes(15) - Duration::milliseconds(1),
        }
    }

    pub fn flat_candles(count: usize, price: f64, volume: f64) -> Vec<Candle> {
        (0..count).map(|i| candle_at(i, price, price, price, price, volume)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{candle_at, flat_candles};
    use super::*;

    #[test]
    fn flat_window_has_zero_range_not_nan() {
        let summary = summarize(&flat_candles(48, 0.02, 10.0), 24, 6);
        assert_eq!(summary.range_percent, 0.0);
        assert!(summary.range_percent.is_finite());
        assert_eq!(summary.periods.len(), 2);
        assert!(summary.periods.iter().all(|p| p.change_percent == 0.0));
    }

    #[test]
    fn zero_priced_window_does_not_divide_by_zero() {
        let summary = summarize(&flat_candles(5, 0.0, 0.0), 2, 6);
        assert_eq!(summary.range_percent, 0.0);
        assert!(summary.periods.iter().all(|p| p.change_percent.is_finite()));
    }

    #[test]
    fn empty_window_summarizes_to_zeroes() {
        let summary = summarize(&[], 24, 6);
        assert_eq!(summary.candles, 0);
        assert_eq!(summary.avg_volume, 0.0);
        assert!(summary.periods.is_empty());
    }

    #[test]
    fn fewer_candles_than_one_bucket_emit_no_periods() {
        let summary = summarize(&flat_candles(23, 1.0, 1.0), 24, 6);
        assert_eq!(summary.candles, 23);
        assert!(summary.periods.is_empty());
        assert_eq!(summary.total_volume, 23.0);
    }

    #[test]
    fn global_stats_and_bucket_changes() {
        let candles = vec![
            candle_at(0, 1.00, 1.10, 0.95, 1.05, 100.0),
            candle_at(1, 1.05, 1.20, 1.00, 1.10, 300.0),
            candle_at(2, 1.10, 1.15, 0.90, 0.99, 200.0),
            candle_at(3, 0.99, 1.00, 0.80, 0.88, 400.0),
            candle_at(4, 0.88, 0.90, 0.85, 0.89, 50.0),
        ];
        let summary = summarize(&candles, 2, 6);
        assert_eq!(summary.high, 1.20);
        assert_eq!(summary.low, 0.80);
        assert!((summary.range_percent - 50.0).abs() < 1e-9);
        assert_eq!(summary.total_volume, 1050.0);
        assert_eq!(summary.avg_volume, 210.0);
        // The trailing single candle does not form a bucket.
        assert_eq!(summary.periods.len(), 2);
        assert!((summary.periods[0].change_percent - 10.0).abs() < 1e-9);
        assert_eq!(summary.periods[0].volume, 400.0);
        assert!((summary.periods[1].change_percent - (-20.0)).abs() < 1e-9);
        assert_eq!(summary.periods[1].start_time, candles[2].open_time);
    }

    #[test]
    fn bucket_count_is_capped() {
        let summary = summarize(&flat_candles(200, 1.0, 1.0), 24, 6);
        assert_eq!(summary.periods.len(), 6);
    }

    #[test]
    fn count_active_skips_zero_volume() {
        let mut candles = flat_candles(4, 1.0, 5.0);
        candles[1].volume = 0.0;
        assert_eq!(count_active(&candles), 3);
    }
}
