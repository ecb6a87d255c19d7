// Numeric and symbol helpers shared by the engine layers.

/// Largest value in `values`, `None` when empty.
pub fn max_of<T: Copy + PartialOrd>(values: &[T]) -> Option<T> {
    values
        .iter()
        .copied()
        .fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}

/// Smallest value in `values`, `None` when empty.
pub fn min_of<T: Copy + PartialOrd>(values: &[T]) -> Option<T> {
    values
        .iter()
        .copied()
        .fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
}

/// Arithmetic mean; an empty slice averages to zero.
pub fn average<T: Copy + Into<f64>>(values: &[T]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v.into()).sum();
    sum / values.len() as f64
}

/// Percentage move from `from` to `to`. A zero or negative base yields 0.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from <= 0.0 || !from.is_finite() || !to.is_finite() {
        return 0.0;
    }
    (to - from) / from * 100.0
}

fn pow10(decimals: u32) -> f64 {
    10f64.powi(decimals as i32)
}

/// Round half-up to `decimals` places. Quantities are non-negative, so half-up
/// and half-away-from-zero agree on every input we feed it.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = pow10(decimals);
    (value * factor + 0.5).floor() / factor
}

/// Round toward zero to `decimals` places.
pub fn round_down(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = pow10(decimals);
    // Nudge by a relative epsilon so 0.29 * 100 does not floor to 28.
    let scaled = value * factor;
    (scaled + scaled.abs() * f64::EPSILON * 4.0).floor() / factor
}

/// Base asset of a pair, e.g. `PEPEUSDT` -> `PEPE`. Symbols without the quote
/// suffix (or consisting only of it) are returned unchanged.
pub fn base_asset<'a>(symbol: &'a str, quote: &str) -> &'a str {
    match symbol.strip_suffix(quote) {
        Some(base) if !base.is_empty() => base,
        _ => symbol,
    }
}
