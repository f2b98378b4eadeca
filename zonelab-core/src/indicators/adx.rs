//! ADX: Average Directional Index with rolling-mean smoothing.
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive bars
//! 2. Smooth +DM, -DM, and TR with a simple rolling mean over `period`
//! 3. +DI = 100 * mean(+DM) / mean(TR)
//! 4. -DI = 100 * mean(-DM) / mean(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = rolling mean of DX
//!
//! A zero mean TR yields DI = 0 and a zero DI sum yields DX = 0.
//! Lookback: 2 * (period - 1).

use super::{rolling_mean, true_range, Indicator};
use crate::domain::Bar;

pub const DEFAULT_ADX_PERIOD: usize = 14;

/// The three directional series, all the same length as the input.
#[derive(Debug, Clone, Default)]
pub struct DirectionalSeries {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }

    /// Compute +DI, -DI and ADX in one pass over the bars.
    pub fn directional(&self, bars: &[Bar]) -> DirectionalSeries {
        let n = bars.len();
        if n == 0 {
            return DirectionalSeries::default();
        }

        let mut plus_dm = vec![0.0; n];
        let mut minus_dm = vec![0.0; n];
        for i in 1..n {
            let up_move = bars[i].high - bars[i - 1].high;
            let down_move = bars[i - 1].low - bars[i].low;
            if up_move.is_nan() || down_move.is_nan() {
                plus_dm[i] = f64::NAN;
                minus_dm[i] = f64::NAN;
                continue;
            }
            if up_move > down_move && up_move > 0.0 {
                plus_dm[i] = up_move;
            }
            if down_move > up_move && down_move > 0.0 {
                minus_dm[i] = down_move;
            }
        }

        let mean_tr = rolling_mean(&true_range(bars), self.period);
        let mean_plus = rolling_mean(&plus_dm, self.period);
        let mean_minus = rolling_mean(&minus_dm, self.period);

        let mut plus_di = vec![f64::NAN; n];
        let mut minus_di = vec![f64::NAN; n];
        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            if mean_tr[i].is_nan() || mean_plus[i].is_nan() || mean_minus[i].is_nan() {
                continue;
            }
            let (p, m) = if mean_tr[i] == 0.0 {
                (0.0, 0.0)
            } else {
                (
                    100.0 * mean_plus[i] / mean_tr[i],
                    100.0 * mean_minus[i] / mean_tr[i],
                )
            };
            plus_di[i] = p;
            minus_di[i] = m;
            let di_sum = p + m;
            dx[i] = if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (p - m).abs() / di_sum
            };
        }

        DirectionalSeries {
            plus_di,
            minus_di,
            adx: rolling_mean(&dx, self.period),
        }
    }
}

impl Default for Adx {
    fn default() -> Self {
        Self::new(DEFAULT_ADX_PERIOD)
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * (self.period - 1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.directional(bars).adx
    }
}
