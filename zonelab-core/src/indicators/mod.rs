//! Indicator implementations.
//!
//! Indicators are pure functions: bar history in, numeric series out. They are
//! precomputed once before the bar loop and queried by index during it.
//! Warmup values are `f64::NAN`; callers treat NaN as "not ready".

pub mod adx;
pub mod atr;
pub mod hurst;

pub use adx::{Adx, DirectionalSeries};
pub use atr::Atr;
pub use hurst::hurst_exponent;

use crate::domain::Bar;

/// Trait for single-series indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_14").
    fn name(&self) -> &str;

    /// Number of leading NaN values in the output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Value at `index`, or `None` when out of range or still warming up.
pub fn value_at(series: &[f64], index: usize) -> Option<f64> {
    series.get(index).copied().filter(|v| v.is_finite())
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    tr[0] = bars[0].high - bars[0].low;

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Simple rolling mean over `window` values.
///
/// The first `window - 1` outputs are NaN, as is any output whose window
/// contains a NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = slice.iter().sum::<f64>() / window as f64;
    }
    result
}

/// Create synthetic 5-minute bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::minutes(5 * i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
            )
            .with_volume(1000.0)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_warmup_and_values() {
        let r = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(r[0].is_nan());
        assert!(r[1].is_nan());
        assert_approx(r[2], 2.0, DEFAULT_EPSILON);
        assert_approx(r[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_nan_poisons_window() {
        let r = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(r[1].is_nan());
        assert!(r[2].is_nan());
        assert_approx(r[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn value_at_filters_warmup() {
        let s = [f64::NAN, 2.0];
        assert_eq!(value_at(&s, 0), None);
        assert_eq!(value_at(&s, 1), Some(2.0));
        assert_eq!(value_at(&s, 2), None);
    }
}
