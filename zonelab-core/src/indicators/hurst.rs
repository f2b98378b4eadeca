//! Hurst exponent via rescaled-range (R/S) analysis.
//!
//! For each lag in `2..min(100, n/2)` the series is split into non-overlapping
//! chunks of exactly `lag` values. Each chunk contributes
//! `(max(cumdev) - min(cumdev)) / std` where `cumdev` is the cumulative
//! deviation from the chunk mean and `std` the population standard deviation;
//! zero-variance chunks are skipped. The exponent is the least-squares slope
//! of `ln(average R/S)` against `ln(lag)`, clamped to `[0, 1]`.
//!
//! H < 0.5: mean reverting. H = 0.5: random walk. H > 0.5: persistent.

/// Returned when there is too little data to estimate.
pub const RANDOM_WALK_HURST: f64 = 0.5;

const MIN_PRICES: usize = 20;
const MAX_LAG: usize = 100;

pub fn hurst_exponent(prices: &[f64]) -> f64 {
    if prices.len() < MIN_PRICES {
        return RANDOM_WALK_HURST;
    }

    let max_lag = MAX_LAG.min(prices.len() / 2);
    let mut log_lags = Vec::new();
    let mut log_rs = Vec::new();

    for lag in 2..max_lag {
        let rs_values: Vec<f64> = prices
            .chunks_exact(lag)
            .filter_map(rescaled_range)
            .collect();
        if rs_values.is_empty() {
            continue;
        }
        let mean_rs = rs_values.iter().sum::<f64>() / rs_values.len() as f64;
        if mean_rs <= 0.0 {
            continue;
        }
        log_lags.push((lag as f64).ln());
        log_rs.push(mean_rs.ln());
    }

    if log_lags.len() < 2 {
        return RANDOM_WALK_HURST;
    }

    match slope(&log_lags, &log_rs) {
        Some(h) => h.clamp(0.0, 1.0),
        None => RANDOM_WALK_HURST,
    }
}

/// R/S of one chunk, `None` when its standard deviation is zero.
fn rescaled_range(chunk: &[f64]) -> Option<f64> {
    let n = chunk.len() as f64;
    let mean = chunk.iter().sum::<f64>() / n;
    let variance = chunk.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std.is_nan() || std <= 0.0 {
        return None;
    }

    let mut cum = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for x in chunk {
        cum += x - mean;
        lo = lo.min(cum);
        hi = hi.max(cum);
    }
    Some((hi - lo) / std)
}

/// Least-squares slope of y on x.
fn slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx).powi(2);
    }
    if sxx == 0.0 {
        None
    } else {
        Some(sxy / sxx)
    }
}
