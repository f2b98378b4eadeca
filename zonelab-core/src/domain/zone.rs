//! Zone: a consolidation-then-breakout price interval.
//!
//! Zones live in an index-addressable arena (`Vec<Zone>` returned by the
//! detector). Other records refer to them by `ZoneId`, never by reference, so
//! the forward-consistency pass can update touches and freshness in place.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Position of a zone in the detector's emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub usize);

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Z{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Resistance: price left the consolidation downward.
    Supply,
    /// Support: price left the consolidation upward.
    Demand,
}

/// Zone lifecycle stage. Ordered: `Fresh < Tested < Broken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Tested,
    Broken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub kind: ZoneKind,
    pub top: f64,
    pub bottom: f64,
    /// Timestamp of the last consolidation bar.
    pub created_at: NaiveDateTime,
    /// Index of the last consolidation bar in the scanned series.
    pub creation_index: usize,
    /// First index at which the zone is confirmed (end of its breakout window).
    pub available_from: usize,
    pub touches: u32,
    pub freshness: Freshness,
    /// Index of the bar that broke the zone, if any.
    pub broken_at: Option<usize>,
    pub strength: f64,
    /// Breakout displacement in ATR multiples.
    pub velocity: f64,
    /// Summed volume across the consolidation window.
    pub volume: f64,
    /// Consolidation length in bars.
    pub time_in_zone: usize,
}

impl Zone {
    pub fn width(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn midpoint(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Inclusive containment with a tolerance expressed as a fraction of the zone width.
    pub fn contains(&self, price: f64, penetration_frac: f64) -> bool {
        let tolerance = self.width() * penetration_frac;
        (self.bottom - tolerance) <= price && price <= (self.top + tolerance)
    }

    /// Bars elapsed since creation (saturating at zero).
    pub fn age(&self, current_index: usize) -> usize {
        current_index.saturating_sub(self.creation_index)
    }

    /// Untested and no older than `max_age` bars.
    pub fn is_fresh(&self, current_index: usize, max_age: usize) -> bool {
        self.freshness == Freshness::Fresh && self.age(current_index) <= max_age
    }

    /// True once the zone's confirmation window has fully printed.
    pub fn is_available(&self, current_index: usize) -> bool {
        current_index >= self.available_from
    }

    /// Whether the zone had been broken strictly before `current_index`.
    pub fn is_broken_before(&self, current_index: usize) -> bool {
        self.broken_at.is_some_and(|b| b < current_index)
    }

    /// Move freshness along `Fresh → Tested → Broken`; never moves backwards.
    pub fn advance_freshness(&mut self, to: Freshness) {
        if to > self.freshness {
            self.freshness = to;
        }
    }
}
