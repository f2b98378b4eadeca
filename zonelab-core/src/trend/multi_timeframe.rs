//! Cross-timeframe aggregation of trend states.
//!
//! Timeframes are kept in insertion order, which callers must make lowest to
//! highest: the dominant regime is taken from the last entry.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Regime, TrendDirection, TrendState};

use super::analyzer::TrendAnalyzer;

/// Default number of agreeing timeframes for `is_aligned`.
pub const DEFAULT_REQUIRED_ALIGNMENT: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiTimeframeTrend {
    states: Vec<(String, TrendState)>,
}

impl MultiTimeframeTrend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze each named series in order. Series still warming up are left out.
    pub fn analyze_all<'a, I>(analyzer: &TrendAnalyzer, timeframes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [Bar])>,
    {
        let mut mtf = Self::new();
        for (name, bars) in timeframes {
            match analyzer.analyze(bars) {
                Some(state) => mtf.insert(name, state),
                None => tracing::debug!(timeframe = name, "trend not ready"),
            }
        }
        mtf
    }

    /// Insert or replace a timeframe. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, state: TrendState) {
        let name = name.into();
        match self.states.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = state,
            None => self.states.push((name, state)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TrendState> {
        self.states.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrendState)> {
        self.states.iter().map(|(n, s)| (n.as_str(), s))
    }

    fn counts(&self) -> (usize, usize) {
        self.states
            .iter()
            .fold((0, 0), |(bull, bear), (_, s)| match s.direction {
                TrendDirection::Bullish => (bull + 1, bear),
                TrendDirection::Bearish => (bull, bear + 1),
                TrendDirection::Neutral => (bull, bear),
            })
    }

    /// At least `required` timeframes share the bullish or bearish direction.
    pub fn is_aligned(&self, required: usize) -> bool {
        if self.states.len() < required {
            return false;
        }
        let (bull, bear) = self.counts();
        bull.max(bear) >= required
    }

    /// Majority of bullish vs bearish; ties (including none) are neutral.
    pub fn dominant_direction(&self) -> TrendDirection {
        let (bull, bear) = self.counts();
        match bull.cmp(&bear) {
            std::cmp::Ordering::Greater => TrendDirection::Bullish,
            std::cmp::Ordering::Less => TrendDirection::Bearish,
            std::cmp::Ordering::Equal => TrendDirection::Neutral,
        }
    }

    /// Regime of the highest (last inserted) timeframe; ranging when empty.
    pub fn dominant_regime(&self) -> Regime {
        self.states
            .last()
            .map_or(Regime::Ranging, |(_, s)| s.regime)
    }

    pub fn average_strength(&self) -> f64 {
        if self.states.is_empty() {
            return 0.0;
        }
        self.states.iter().map(|(_, s)| s.strength).sum::<f64>() / self.states.len() as f64
    }
}
