//! Error taxonomy for the core.
//!
//! Insufficient history (ATR or higher-timeframe context not ready) is not an
//! error: the dependent computation is skipped for that bar.

use chrono::NaiveDateTime;
use thiserror::Error;

/// The price series cannot be simulated. Fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("price series is empty")]
    Empty,

    #[error("malformed bar at index {index} ({timestamp}): {reason}")]
    MalformedBar {
        index: usize,
        timestamp: NaiveDateTime,
        reason: String,
    },

    #[error("timestamps not strictly increasing at index {index}: {previous} then {current}")]
    NonMonotonic {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("resample width must be at least one minute")]
    InvalidResampleWidth,
}

/// A parameter set that cannot be used. Raised at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be at least 1")]
    ZeroLength { name: &'static str },

    #[error("strength weights must be non-negative and sum to 1, got {sum}")]
    MalformedWeights { sum: f64 },

    #[error("{name} must lie in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },

    #[error("min_zone_age ({min}) exceeds max_zone_age ({max})")]
    ZoneAgeBounds { min: usize, max: usize },

    #[error("time window half-width {minutes} must be below {limit} minutes")]
    WindowWidth { minutes: u32, limit: u32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Require `value` to be finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NonPositive { name, value })
    }
}

/// Require a window length of at least one bar.
pub(crate) fn ensure_length(name: &'static str, value: usize) -> Result<(), ParameterError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ParameterError::ZeroLength { name })
    }
}
