//! ZoneLab Core: zone detection, trend classification, and the simulation engine.
//!
//! This crate contains:
//! - Domain types (bars, zones, trades, trend states, equity points)
//! - Indicators (ATR, ADX/DI, Hurst exponent)
//! - Periodic time classifier and trading sessions
//! - Supply/demand zone detector with strength scoring and a forward pass
//! - Single- and multi-timeframe trend/regime classifier
//! - Series validation and resampling
//! - Bar-by-bar simulation engine with a multi-stage exit policy
//!
//! Everything here is single-threaded and free of I/O. Independent runs share
//! no state and may be executed in parallel by the caller.

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod time_filter;
pub mod trend;
pub mod zones;

pub use engine::{run_backtest, BacktestConfig, RunResult};
pub use error::{DataError, ParameterError, SimulationError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across threads by the runner are
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Zone>();
        require_sync::<domain::Zone>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::TrendState>();
        require_sync::<domain::TrendState>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();

        // Engine types
        require_send::<engine::BacktestConfig>();
        require_sync::<engine::BacktestConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<zones::ZoneDetector>();
        require_sync::<zones::ZoneDetector>();
        require_send::<trend::TrendAnalyzer>();
        require_sync::<trend::TrendAnalyzer>();

        // Errors
        require_send::<SimulationError>();
        require_sync::<SimulationError>();
    }

    /// Indicators must not see the future: a truncated series gives the same
    /// values as the full series up to the truncation point.
    #[test]
    fn indicators_are_causal() {
        use indicators::{make_bars, Adx, Atr, Indicator};

        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 3.0 + (i as f64 * 0.05))
            .collect();
        let bars = make_bars(&closes);
        let cut = 70;
        let ind: [Box<dyn Indicator>; 2] = [Box::new(Atr::new(14)), Box::new(Adx::new(14))];
        for indicator in &ind {
            let full = indicator.compute(&bars);
            let truncated = indicator.compute(&bars[..cut]);
            for i in 0..cut {
                assert!(
                    (full[i].is_nan() && truncated[i].is_nan()) || full[i] == truncated[i],
                    "{} differs at {i}",
                    indicator.name()
                );
            }
        }
    }
}
