//! Per-timeframe trend snapshot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Trending,
    Ranging,
    Volatile,
}

/// Trend state of one timeframe at one bar. Built fresh on every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub direction: TrendDirection,
    pub regime: Regime,
    /// `min(adx / 50, 1)`.
    pub strength: f64,
    pub adx: f64,
    pub hurst: f64,
}
