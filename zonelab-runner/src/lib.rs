//! ZoneLab Runner: run files, data loading, metrics, validation matrix.
//!
//! This crate builds on `zonelab-core` to provide:
//! - TOML run files with strategy parameters, filter variants and periods
//! - CSV bar loading with date filtering, plus a synthetic fallback
//! - Single runs and the parallel variant × period validation matrix
//! - Run reports (win rate, profit factor, expectancy, drawdown, streaks)
//! - Run fingerprinting and JSON/CSV artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fingerprint;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, Period, RunFile, RunSection, Variant};
pub use data_loader::{
    dataset_hash, generate_synthetic_bars, load_csv, read_bars, LoadError, LoadOptions,
    LoadedData,
};
pub use export::{load_artifacts, save_artifacts};
pub use fingerprint::RunFingerprint;
pub use metrics::BacktestReport;
pub use runner::{
    load_data, run_file, run_matrix, run_single, HtfSpec, RunError, RunOutput, RunRequest,
    SCHEMA_VERSION,
};
