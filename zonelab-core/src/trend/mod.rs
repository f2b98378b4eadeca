//! Trend direction and regime classification, per timeframe and across
//! timeframes.

pub mod analyzer;
pub mod multi_timeframe;

pub use analyzer::{TrendAnalyzer, TrendParams};
pub use multi_timeframe::MultiTimeframeTrend;
