//! Simulation engine: configuration, state, higher-timeframe context, entry
//! logic, and the bar loop.

pub mod config;
pub mod entry;
pub mod htf;
pub mod loop_runner;
pub mod state;

pub use config::BacktestConfig;
pub use htf::HtfContext;
pub use loop_runner::run_backtest;
pub use state::{EngineState, RunResult};
