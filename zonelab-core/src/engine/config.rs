//! Backtest configuration.
//!
//! Supplied once per run and read-only for its duration. Every field has a
//! default, so a partial TOML table overrides only what it names.

use serde::{Deserialize, Serialize};

use crate::domain::ExitPolicy;
use crate::error::{ensure_positive, ParameterError};
use crate::time_filter::TimeWindowParams;
use crate::trend::TrendParams;
use crate::zones::{DetectorParams, ZoneShape};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    // ── Zone shape ──
    pub min_consolidation: usize,
    pub zone_width_atr: f64,
    pub min_velocity_atr: f64,

    // ── Filters ──
    /// Trade only zones created inside a periodic time window.
    pub enable_time_filter: bool,
    /// Require a bullish (bearish) higher-timeframe trend for longs (shorts).
    pub enable_trend_filter: bool,
    /// Judge a zone broken only once the breaking bar has printed. Off: any
    /// zone whose final freshness is `Broken` is skipped for the whole run.
    pub break_as_of_bar: bool,

    // ── Risk ──
    /// Fraction of capital risked per trade (1R), in (0, 1].
    pub risk_fraction: f64,
    pub tp1_atr: f64,
    pub tp2_atr: f64,
    /// Stop distance beyond the zone's far boundary.
    pub sl_atr: f64,
    /// Fraction of the position closed at TP1, in (0, 1).
    pub tp1_close_fraction: f64,
    pub breakeven_at_tp1: bool,

    // ── Trade flow ──
    pub max_zone_age: usize,
    pub min_zone_age: usize,
    pub max_trades_per_day: usize,
    pub max_open_trades: usize,

    // ── Account ──
    pub initial_capital: f64,

    // ── History requirements ──
    /// First lower-timeframe bar simulated.
    pub warmup_bars: usize,
    /// Higher-timeframe bars required before a bar is simulated.
    pub min_htf_history: usize,

    pub detector: DetectorParams,
    pub trend: TrendParams,
    pub time_windows: TimeWindowParams,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            min_consolidation: 3,
            zone_width_atr: 0.5,
            min_velocity_atr: 1.0,
            enable_time_filter: true,
            enable_trend_filter: true,
            break_as_of_bar: false,
            risk_fraction: 0.01,
            tp1_atr: 1.0,
            tp2_atr: 2.5,
            sl_atr: 1.5,
            tp1_close_fraction: 0.5,
            breakeven_at_tp1: true,
            max_zone_age: 50,
            min_zone_age: 5,
            max_trades_per_day: 3,
            max_open_trades: 2,
            initial_capital: 10_000.0,
            warmup_bars: 100,
            min_htf_history: 100,
            detector: DetectorParams::default(),
            trend: TrendParams::default(),
            time_windows: TimeWindowParams::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ParameterError> {
        ensure_positive("zone_width_atr", self.zone_width_atr)?;
        ensure_positive("min_velocity_atr", self.min_velocity_atr)?;
        ensure_positive("tp1_atr", self.tp1_atr)?;
        ensure_positive("tp2_atr", self.tp2_atr)?;
        ensure_positive("sl_atr", self.sl_atr)?;
        ensure_positive("initial_capital", self.initial_capital)?;

        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(ParameterError::OutOfRange {
                name: "risk_fraction",
                range: "(0, 1]",
                value: self.risk_fraction,
            });
        }
        if !(self.tp1_close_fraction > 0.0 && self.tp1_close_fraction < 1.0) {
            return Err(ParameterError::OutOfRange {
                name: "tp1_close_fraction",
                range: "(0, 1)",
                value: self.tp1_close_fraction,
            });
        }
        if self.min_zone_age > self.max_zone_age {
            return Err(ParameterError::ZoneAgeBounds {
                min: self.min_zone_age,
                max: self.max_zone_age,
            });
        }

        self.detector.weights.validate()?;
        self.trend.validate()?;
        self.time_windows.validate()?;
        Ok(())
    }

    pub fn zone_shape(&self) -> ZoneShape {
        ZoneShape {
            min_consolidation: self.min_consolidation,
            zone_width_atr: self.zone_width_atr,
            min_velocity_atr: self.min_velocity_atr,
        }
    }

    pub fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy {
            tp1_close_fraction: self.tp1_close_fraction,
            breakeven_at_tp1: self.breakeven_at_tp1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(BacktestConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_thresholds() {
        let c = BacktestConfig {
            zone_width_atr: 0.0,
            ..BacktestConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ParameterError::NonPositive {
                name: "zone_width_atr",
                ..
            })
        ));
        let c = BacktestConfig {
            min_velocity_atr: -0.5,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_bad_fractions() {
        for f in [0.0, 1.0, 1.5] {
            let c = BacktestConfig {
                tp1_close_fraction: f,
                ..BacktestConfig::default()
            };
            assert!(c.validate().is_err(), "close fraction {f}");
        }
        let c = BacktestConfig {
            risk_fraction: 0.0,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_inverted_zone_ages() {
        let c = BacktestConfig {
            min_zone_age: 60,
            ..BacktestConfig::default()
        };
        assert_eq!(
            c.validate(),
            Err(ParameterError::ZoneAgeBounds { min: 60, max: 50 })
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let c: BacktestConfig =
            serde_json::from_str(r#"{"sl_atr": 2.0, "detector": {"lookback": 50}}"#).unwrap();
        assert_eq!(c.sl_atr, 2.0);
        assert_eq!(c.detector.lookback, 50);
        assert_eq!(c.detector.atr_period, 14);
        assert_eq!(c.max_open_trades, 2);
    }
}
