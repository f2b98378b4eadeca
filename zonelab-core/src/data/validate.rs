//! Series validation.

use crate::domain::Bar;
use crate::error::DataError;

fn malformed_reason(bar: &Bar) -> Option<&'static str> {
    if bar.is_void() {
        return Some("non-finite price");
    }
    if bar.high < bar.low {
        return Some("high below low");
    }
    if bar.open < bar.low || bar.open > bar.high {
        return Some("open outside high/low range");
    }
    if bar.close < bar.low || bar.close > bar.high {
        return Some("close outside high/low range");
    }
    if bar.volume.is_some_and(|v| !v.is_finite() || v < 0.0) {
        return Some("negative or non-finite volume");
    }
    None
}

/// Check that `bars` is non-empty, every bar is sane, and timestamps are
/// strictly increasing.
pub fn validate_series(bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::Empty);
    }
    for (index, bar) in bars.iter().enumerate() {
        if let Some(reason) = malformed_reason(bar) {
            return Err(DataError::MalformedBar {
                index,
                timestamp: bar.timestamp,
                reason: reason.to_string(),
            });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(DataError::NonMonotonic {
                index,
                previous: bars[index - 1].timestamp,
                current: bar.timestamp,
            });
        }
    }
    Ok(())
}
