//! Run file: the TOML document that describes one validation run.
//!
//! ```toml
//! [run]
//! instrument = "XAUUSD"
//! data = "data/XAUUSD_M5.csv"
//! htf_minutes = 60
//!
//! [strategy]          # BacktestConfig, every key optional
//! risk_fraction = 0.01
//!
//! [[variants]]        # optional, defaults to the four filter combinations
//! name = "time_only"
//! time_filter = true
//! trend_filter = false
//!
//! [[periods]]         # optional, defaults to the whole file
//! name = "2023"
//! start = "2023-01-01"
//! end = "2023-12-31"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zonelab_core::data::BucketLabel;
use zonelab_core::error::ParameterError;
use zonelab_core::BacktestConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy parameters: {0}")]
    Parameter(#[from] ParameterError),

    #[error("period '{name}' ends ({end}) before it starts ({start})")]
    EmptyPeriod {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("higher timeframe must be at least one minute")]
    ZeroHtfMinutes,

    #[error("duplicate variant name '{0}'")]
    DuplicateVariant(String),
}

/// `[run]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    pub instrument: String,
    /// CSV bar file. Relative paths resolve against the run file's directory.
    #[serde(default)]
    pub data: Option<PathBuf>,
    #[serde(default = "default_htf_minutes")]
    pub htf_minutes: u32,
    #[serde(default)]
    pub htf_label: BucketLabel,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

fn default_htf_minutes() -> u32 {
    60
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            instrument: "UNKNOWN".into(),
            data: None,
            htf_minutes: default_htf_minutes(),
            htf_label: BucketLabel::default(),
            start: None,
            end: None,
        }
    }
}

/// One filter combination in the validation matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub time_filter: bool,
    pub trend_filter: bool,
}

impl Variant {
    pub fn new(name: &str, time_filter: bool, trend_filter: bool) -> Self {
        Self {
            name: name.into(),
            time_filter,
            trend_filter,
        }
    }

    /// `base` with this variant's filter toggles.
    pub fn apply(&self, base: &BacktestConfig) -> BacktestConfig {
        BacktestConfig {
            enable_time_filter: self.time_filter,
            enable_trend_filter: self.trend_filter,
            ..base.clone()
        }
    }

    /// Time + trend, time only, trend only, no filters.
    pub fn defaults() -> Vec<Variant> {
        vec![
            Variant::new("time_and_trend", true, true),
            Variant::new("time_only", true, false),
            Variant::new("trend_only", false, true),
            Variant::new("no_filters", false, false),
        ]
    }
}

/// A named inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub strategy: BacktestConfig,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub periods: Vec<Period>,
}

impl RunFile {
    /// Load and validate a run file. A relative `data` path is resolved
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self::from_toml(&content)?;
        if let (Some(data), Some(dir)) = (file.run.data.as_ref(), path.parent()) {
            if data.is_relative() {
                file.run.data = Some(dir.join(data));
            }
        }
        Ok(file)
    }

    /// Parse and validate a run file.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: RunFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        if self.run.htf_minutes == 0 {
            return Err(ConfigError::ZeroHtfMinutes);
        }
        for p in &self.periods {
            if p.end < p.start {
                return Err(ConfigError::EmptyPeriod {
                    name: p.name.clone(),
                    start: p.start,
                    end: p.end,
                });
            }
        }
        for (i, v) in self.variants.iter().enumerate() {
            if self.variants[..i].iter().any(|o| o.name == v.name) {
                return Err(ConfigError::DuplicateVariant(v.name.clone()));
            }
        }
        Ok(())
    }

    /// Configured variants, or the four defaults when none are listed.
    pub fn matrix_variants(&self) -> Vec<Variant> {
        if self.variants.is_empty() {
            Variant::defaults()
        } else {
            self.variants.clone()
        }
    }
}
