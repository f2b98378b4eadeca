//! Minute-of-hour windows.
//!
//! ```text
//! minute  0 ....... K ........ 30-K' .. 30 .. 30+K' ........ 60-K .. 59
//!         [hourly turn]        [   half hour    ]            [hourly turn]
//! ```
//!
//! The hourly-turn window wraps across the hour boundary. Bounds are
//! inclusive. A minute in neither window is `Other`.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::ParameterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicWindow {
    HourlyTurn,
    HalfHour,
    Other,
}

impl PeriodicWindow {
    pub fn is_window(self) -> bool {
        !matches!(self, PeriodicWindow::Other)
    }
}

/// Which side of the windows to keep when filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSelection {
    Inside,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindowParams {
    /// K: minutes either side of the hour.
    pub hourly_turn_minutes: u32,
    /// K′: minutes either side of the half hour.
    pub half_hour_minutes: u32,
}

impl Default for TimeWindowParams {
    fn default() -> Self {
        Self {
            hourly_turn_minutes: 5,
            half_hour_minutes: 3,
        }
    }
}

impl TimeWindowParams {
    pub fn validate(&self) -> Result<(), ParameterError> {
        for minutes in [self.hourly_turn_minutes, self.half_hour_minutes] {
            if minutes >= 30 {
                return Err(ParameterError::WindowWidth { minutes, limit: 30 });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicClassifier {
    params: TimeWindowParams,
}

impl Default for PeriodicClassifier {
    fn default() -> Self {
        Self {
            params: TimeWindowParams::default(),
        }
    }
}

impl PeriodicClassifier {
    pub fn new(params: TimeWindowParams) -> Result<Self, ParameterError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> TimeWindowParams {
        self.params
    }

    /// Classify a minute of the hour (0..=59). The hourly turn takes
    /// precedence when the windows overlap.
    pub fn classify_minute(&self, minute: u32) -> PeriodicWindow {
        let k = self.params.hourly_turn_minutes;
        let half = self.params.half_hour_minutes;
        if minute >= 60 - k || minute <= k {
            PeriodicWindow::HourlyTurn
        } else if (30 - half..=30 + half).contains(&minute) {
            PeriodicWindow::HalfHour
        } else {
            PeriodicWindow::Other
        }
    }

    pub fn classify(&self, timestamp: NaiveDateTime) -> PeriodicWindow {
        self.classify_minute(timestamp.minute())
    }

    pub fn in_window(&self, timestamp: NaiveDateTime) -> bool {
        self.classify(timestamp).is_window()
    }

    /// Keep the bars on one side of the windows, preserving order.
    pub fn filter<'a>(&self, bars: &'a [Bar], selection: WindowSelection) -> Vec<&'a Bar> {
        let keep_inside = selection == WindowSelection::Inside;
        bars.iter()
            .filter(|b| self.in_window(b.timestamp) == keep_inside)
            .collect()
    }
}
