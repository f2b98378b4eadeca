//! Single-timeframe trend analysis.
//!
//! - direction: +DI vs −DI (exact equality is neutral)
//! - regime: trending when ADX > threshold and Hurst > trending threshold,
//!   ranging when ADX < threshold and Hurst < ranging threshold, else volatile
//! - strength: `min(ADX / 50, 1)`

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Regime, TrendDirection, TrendState};
use crate::error::{ensure_length, ensure_positive, ParameterError};
use crate::indicators::{hurst_exponent, value_at, Adx, DirectionalSeries};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    pub adx_period: usize,
    pub adx_threshold: f64,
    /// Trailing closes fed to the Hurst estimate.
    pub hurst_window: usize,
    pub hurst_trending: f64,
    pub hurst_ranging: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            adx_period: 14,
            adx_threshold: 25.0,
            hurst_window: 100,
            hurst_trending: 0.55,
            hurst_ranging: 0.45,
        }
    }
}

impl TrendParams {
    pub fn validate(&self) -> Result<(), ParameterError> {
        ensure_length("adx_period", self.adx_period)?;
        ensure_length("hurst_window", self.hurst_window)?;
        ensure_positive("adx_threshold", self.adx_threshold)?;
        for (name, value) in [
            ("hurst_trending", self.hurst_trending),
            ("hurst_ranging", self.hurst_ranging),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParameterError::OutOfRange {
                    name,
                    range: "[0, 1]",
                    value,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    params: TrendParams,
}

impl TrendAnalyzer {
    pub fn new(params: TrendParams) -> Result<Self, ParameterError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TrendParams {
        &self.params
    }

    /// Trend state at the last bar, `None` while ADX is still warming up.
    pub fn analyze(&self, bars: &[Bar]) -> Option<TrendState> {
        let last = bars.len().checked_sub(1)?;
        let series = Adx::new(self.params.adx_period).directional(bars);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        self.state_at(&series, &closes, last)
    }

    /// Trend state at every bar, each using only bars up to and including it.
    pub fn analyze_series(&self, bars: &[Bar]) -> Vec<Option<TrendState>> {
        let series = Adx::new(self.params.adx_period).directional(bars);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        (0..bars.len())
            .map(|i| self.state_at(&series, &closes, i))
            .collect()
    }

    fn state_at(&self, series: &DirectionalSeries, closes: &[f64], i: usize) -> Option<TrendState> {
        let adx = value_at(&series.adx, i)?;
        let plus_di = value_at(&series.plus_di, i)?;
        let minus_di = value_at(&series.minus_di, i)?;
        let start = (i + 1).saturating_sub(self.params.hurst_window);
        let hurst = hurst_exponent(&closes[start..=i]);
        Some(self.classify(plus_di, minus_di, adx, hurst))
    }

    pub fn classify(&self, plus_di: f64, minus_di: f64, adx: f64, hurst: f64) -> TrendState {
        let direction = if plus_di > minus_di {
            TrendDirection::Bullish
        } else if minus_di > plus_di {
            TrendDirection::Bearish
        } else {
            TrendDirection::Neutral
        };

        let p = &self.params;
        let regime = if adx > p.adx_threshold && hurst > p.hurst_trending {
            Regime::Trending
        } else if adx < p.adx_threshold && hurst < p.hurst_ranging {
            Regime::Ranging
        } else {
            Regime::Volatile
        };

        TrendState {
            direction,
            regime,
            strength: (adx / 50.0).clamp(0.0, 1.0),
            adx,
            hurst,
        }
    }
}
