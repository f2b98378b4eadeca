//! Higher-timeframe trend context.
//!
//! Trend states are computed once over the whole higher-timeframe series,
//! each from bars up to and including its own index. During the loop the
//! context for a lower-timeframe bar is the latest higher-timeframe bar whose
//! timestamp is not after it.

use chrono::NaiveDateTime;

use crate::domain::{Bar, TrendState};
use crate::trend::TrendAnalyzer;

#[derive(Debug, Clone)]
pub struct HtfContext {
    timestamps: Vec<NaiveDateTime>,
    states: Vec<Option<TrendState>>,
}

impl HtfContext {
    pub fn new(analyzer: &TrendAnalyzer, bars: &[Bar]) -> Self {
        Self {
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            states: analyzer.analyze_series(bars),
        }
    }

    /// Index of the latest bar at or before `timestamp`.
    pub fn index_at(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.timestamps
            .partition_point(|t| *t <= timestamp)
            .checked_sub(1)
    }

    /// Trend state at `timestamp`, requiring at least `min_history` earlier bars.
    pub fn resolve(&self, timestamp: NaiveDateTime, min_history: usize) -> Option<TrendState> {
        let idx = self.index_at(timestamp)?;
        if idx < min_history {
            return None;
        }
        self.states.get(idx).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
