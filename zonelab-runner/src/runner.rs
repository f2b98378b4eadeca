//! Run orchestration: wires data, engine, metrics and fingerprints together.
//!
//! Entry points:
//! - `load_data()`: bars for a run file (CSV, or synthetic for development)
//! - `run_single()`: one simulation on pre-loaded bars, no I/O
//! - `run_file()`: the run file's strategy over the whole data range
//! - `run_matrix()`: every variant × period cell, in parallel

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zonelab_core::data::{resample, BucketLabel};
use zonelab_core::domain::{Bar, Zone};
use zonelab_core::error::{DataError, ParameterError, SimulationError};
use zonelab_core::time_filter::{PeriodicClassifier, ZoneWindowProfile};
use zonelab_core::zones::ZoneSummary;
use zonelab_core::{run_backtest, BacktestConfig};

use crate::config::{ConfigError, Period, RunFile, Variant};
use crate::data_loader::{
    dataset_hash, generate_synthetic_bars, load_csv, LoadError, LoadOptions, LoadedData,
};
use crate::fingerprint::RunFingerprint;
use crate::metrics::BacktestReport;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("invalid parameters: {0}")]
    Parameter(#[from] ParameterError),
    #[error("resampling failed: {0}")]
    Resample(#[from] DataError),
    #[error("failed to fingerprint configuration: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("no data file configured (set [run] data or use synthetic data)")]
    NoDataSource,
}

/// Current schema version for persisted run reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Days of synthetic data generated when the run file gives no end date.
pub const DEFAULT_SYNTHETIC_DAYS: u32 = 60;

/// Label used when a run covers the whole data range.
pub const FULL_PERIOD: &str = "full";
/// Variant label of a plain (non-matrix) run.
pub const BASE_VARIANT: &str = "base";

/// How the higher timeframe is derived from the loaded bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtfSpec {
    pub minutes: u32,
    pub label: BucketLabel,
}

impl HtfSpec {
    pub fn from_file(file: &RunFile) -> Self {
        Self {
            minutes: file.run.htf_minutes,
            label: file.run.htf_label,
        }
    }
}

/// Everything one simulation needs.
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub instrument: &'a str,
    pub bars: &'a [Bar],
    pub has_synthetic: bool,
    pub config: BacktestConfig,
    pub htf: HtfSpec,
    pub variant: String,
    pub period: String,
}

/// Complete result of one run, as persisted to `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub variant: String,
    pub period: String,
    pub fingerprint: RunFingerprint,
    pub config: BacktestConfig,
    pub htf: HtfSpec,
    pub zone_summary: ZoneSummary,
    pub window_profile: ZoneWindowProfile,
    /// Zones that passed the time filter.
    pub eligible_zones: usize,
    pub bars_processed: usize,
    pub zones: Vec<Zone>,
    pub report: BacktestReport,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the bars a run file points at, or synthetic bars when asked.
pub fn load_data(file: &RunFile, synthetic: bool) -> Result<LoadedData, RunError> {
    if synthetic {
        let start = file
            .run
            .start
            .or_else(|| NaiveDate::from_ymd_opt(2024, 1, 1))
            .unwrap_or_default();
        let days = file
            .run
            .end
            .map(|end| (end - start).num_days() + 1)
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(DEFAULT_SYNTHETIC_DAYS);
        return Ok(generate_synthetic_bars(&file.run.instrument, start, days));
    }
    let path = file.run.data.as_ref().ok_or(RunError::NoDataSource)?;
    let opts = LoadOptions {
        start: file.run.start,
        end: file.run.end,
    };
    Ok(load_csv(path, &opts)?)
}

/// Run one simulation on pre-loaded bars. No I/O.
pub fn run_single(req: &RunRequest<'_>) -> Result<RunOutput, RunError> {
    tracing::info!(
        instrument = req.instrument,
        variant = %req.variant,
        period = %req.period,
        bars = req.bars.len(),
        "run starting"
    );

    let htf_bars = resample(req.bars, req.htf.minutes, req.htf.label)?;
    let result = run_backtest(req.bars, &htf_bars, &req.config)?;

    let classifier = PeriodicClassifier::new(req.config.time_windows)?;
    let window_profile = ZoneWindowProfile::compute(&classifier, &result.zones, req.bars);
    let fingerprint = RunFingerprint::new(
        &req.config,
        &dataset_hash(req.bars),
        req.instrument,
        req.htf.minutes,
        req.has_synthetic,
    )?;
    let report = BacktestReport::compute(req.instrument, &result);

    tracing::info!(
        instrument = req.instrument,
        variant = %req.variant,
        period = %req.period,
        zones = result.zones.len(),
        trades = report.total_trades,
        win_rate = report.win_rate,
        total_r = report.total_pnl_r,
        "run finished"
    );

    Ok(RunOutput {
        schema_version: SCHEMA_VERSION,
        variant: req.variant.clone(),
        period: req.period.clone(),
        fingerprint,
        config: req.config.clone(),
        htf: req.htf,
        zone_summary: ZoneSummary::from_zones(&result.zones),
        window_profile,
        eligible_zones: result.eligible_zones,
        bars_processed: result.bars_processed,
        zones: result.zones,
        report,
    })
}

/// The run file's strategy over all loaded bars.
pub fn run_file(file: &RunFile, data: &LoadedData) -> Result<RunOutput, RunError> {
    run_single(&RunRequest {
        instrument: &file.run.instrument,
        bars: &data.bars,
        has_synthetic: data.has_synthetic,
        config: file.strategy.clone(),
        htf: HtfSpec::from_file(file),
        variant: BASE_VARIANT.into(),
        period: FULL_PERIOD.into(),
    })
}

/// Bars whose date falls inside `period`. `bars` must be sorted.
pub fn slice_period<'a>(bars: &'a [Bar], period: &Period) -> &'a [Bar] {
    let lo = bars.partition_point(|b| b.date() < period.start);
    let hi = bars.partition_point(|b| b.date() <= period.end);
    &bars[lo..hi.max(lo)]
}

/// Every variant × period cell, executed in parallel.
///
/// Cells share only read-only inputs. Output order is variants outer,
/// periods inner, independent of scheduling. Without `[[periods]]` the
/// matrix has a single full-range period.
pub fn run_matrix(file: &RunFile, data: &LoadedData) -> Result<Vec<RunOutput>, RunError> {
    let variants = file.matrix_variants();
    let periods: Vec<Option<&Period>> = if file.periods.is_empty() {
        vec![None]
    } else {
        file.periods.iter().map(Some).collect()
    };

    let cells: Vec<(&Variant, Option<&Period>)> = variants
        .iter()
        .flat_map(|v| periods.iter().map(move |p| (v, *p)))
        .collect();
    tracing::info!(
        variants = variants.len(),
        periods = periods.len(),
        cells = cells.len(),
        "running validation matrix"
    );

    let htf = HtfSpec::from_file(file);
    cells
        .par_iter()
        .map(|(variant, period)| {
            let (bars, period_name) = match period {
                Some(p) => (slice_period(&data.bars, p), p.name.clone()),
                None => (data.bars.as_slice(), FULL_PERIOD.to_string()),
            };
            if bars.is_empty() {
                tracing::warn!(variant = %variant.name, period = %period_name, "no bars in period");
            }
            run_single(&RunRequest {
                instrument: &file.run.instrument,
                bars,
                has_synthetic: data.has_synthetic,
                config: variant.apply(&file.strategy),
                htf,
                variant: variant.name.clone(),
                period: period_name,
            })
        })
        .collect()
}
