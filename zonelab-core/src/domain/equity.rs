use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One point of the equity curve, produced per simulated bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Realized capital plus unrealized R-based P&L of open trades at the close.
    pub equity: f64,
    /// Percentage drawdown from the running peak (non-negative).
    pub drawdown_pct: f64,
    pub closed_trades: usize,
    pub open_trades: usize,
}
