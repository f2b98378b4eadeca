//! How bars and zones distribute across the periodic windows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::periodic::{PeriodicClassifier, PeriodicWindow};
use crate::domain::{Bar, Zone};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub total_bars: usize,
    pub hourly_turn_bars: usize,
    pub hourly_turn_pct: f64,
    pub half_hour_bars: usize,
    pub half_hour_pct: f64,
    /// Bars in either window.
    pub window_bars: usize,
    pub window_pct: f64,
    pub other_bars: usize,
    pub other_pct: f64,
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl WindowStatistics {
    pub fn from_timestamps<I>(classifier: &PeriodicClassifier, timestamps: I) -> Self
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut total = 0;
        let mut hourly = 0;
        let mut half = 0;
        for ts in timestamps {
            total += 1;
            match classifier.classify(ts) {
                PeriodicWindow::HourlyTurn => hourly += 1,
                PeriodicWindow::HalfHour => half += 1,
                PeriodicWindow::Other => {}
            }
        }
        let window = hourly + half;
        let other = total - window;
        Self {
            total_bars: total,
            hourly_turn_bars: hourly,
            hourly_turn_pct: pct(hourly, total),
            half_hour_bars: half,
            half_hour_pct: pct(half, total),
            window_bars: window,
            window_pct: pct(window, total),
            other_bars: other,
            other_pct: pct(other, total),
        }
    }

    pub fn from_bars(classifier: &PeriodicClassifier, bars: &[Bar]) -> Self {
        Self::from_timestamps(classifier, bars.iter().map(|b| b.timestamp))
    }
}

/// Share of zones created inside a window divided by the share of bars inside
/// a window. Returns 0 when there are no zones or no window bars.
pub fn concentration_factor(classifier: &PeriodicClassifier, zones: &[Zone], bars: &[Bar]) -> f64 {
    let baseline = WindowStatistics::from_bars(classifier, bars).window_pct;
    if zones.is_empty() || baseline <= 0.0 {
        return 0.0;
    }
    let in_window = zones
        .iter()
        .filter(|z| classifier.in_window(z.created_at))
        .count();
    pct(in_window, zones.len()) / baseline
}

/// Zone counts and mean strength split by window membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneWindowProfile {
    pub zones_total: usize,
    pub zones_in_window: usize,
    pub zones_in_window_pct: f64,
    pub concentration_factor: f64,
    pub avg_strength: f64,
    pub window_strength: f64,
    pub other_strength: f64,
}

fn mean_strength<'a>(zones: impl Iterator<Item = &'a Zone>) -> f64 {
    let (sum, n) = zones.fold((0.0, 0usize), |(s, n), z| (s + z.strength, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

impl ZoneWindowProfile {
    pub fn compute(classifier: &PeriodicClassifier, zones: &[Zone], bars: &[Bar]) -> Self {
        let (inside, outside): (Vec<&Zone>, Vec<&Zone>) =
            zones.iter().partition(|z| classifier.in_window(z.created_at));
        Self {
            zones_total: zones.len(),
            zones_in_window: inside.len(),
            zones_in_window_pct: pct(inside.len(), zones.len()),
            concentration_factor: concentration_factor(classifier, zones, bars),
            avg_strength: mean_strength(zones.iter()),
            window_strength: mean_strength(inside.into_iter()),
            other_strength: mean_strength(outside.into_iter()),
        }
    }
}
