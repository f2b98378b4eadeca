//! Run metrics: pure functions from a trade ledger and equity curve to a report.
//!
//! P&L is in R (multiples of each trade's initial risk). A trade with
//! `pnl_r > 0` is a win; everything else, breakeven included, is a loss.
//! Every ratio with a zero denominator is reported as 0.

use serde::{Deserialize, Serialize};

use zonelab_core::domain::{EquityPoint, Trade};
use zonelab_core::RunResult;

/// Aggregate report for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub instrument: String,
    /// `"YYYY-MM-DD to YYYY-MM-DD"`, empty when there were no bars.
    pub period: String,
    pub duration_days: i64,
    pub bars: usize,

    // ── Trade counts ──
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percent of trades that won.
    pub win_rate: f64,
    pub trades_per_month: f64,

    // ── P&L (R) ──
    pub total_pnl_r: f64,
    pub avg_win_r: f64,
    pub avg_loss_r: f64,
    pub profit_factor: f64,
    pub expectancy_r: f64,

    // ── Risk ──
    pub max_drawdown_pct: f64,
    /// Mean over population standard deviation of per-trade R.
    pub sharpe_ratio: f64,

    // ── Capital ──
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return_pct: f64,

    // ── Streaks ──
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // ── Trades from zones formed inside a time window ──
    pub window_trades: usize,
    pub window_trades_pct: f64,
    pub window_win_rate: f64,

    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    /// Compute the report for a finished run.
    pub fn compute(instrument: &str, result: &RunResult) -> Self {
        let trades = &result.trades;
        let (duration_days, period) = match (result.first_timestamp, result.last_timestamp) {
            (Some(first), Some(last)) => (
                (last - first).num_days(),
                format!("{} to {}", first.date(), last.date()),
            ),
            _ => (0, String::new()),
        };

        let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl_r).collect();
        let losses: Vec<f64> = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl_r)
            .collect();
        let window: Vec<&Trade> = trades.iter().filter(|t| t.formed_in_window).collect();

        let rate = win_rate(trades.iter());
        Self {
            instrument: instrument.to_string(),
            period,
            duration_days,
            bars: result.bars,

            total_trades: trades.len(),
            wins: wins.len(),
            losses: losses.len(),
            win_rate: rate,
            trades_per_month: trades_per_month(trades.len(), duration_days),

            total_pnl_r: trades.iter().map(|t| t.pnl_r).sum(),
            avg_win_r: mean(&wins),
            avg_loss_r: mean(&losses),
            profit_factor: profit_factor(trades),
            expectancy_r: expectancy(rate, mean(&wins), mean(&losses)),

            max_drawdown_pct: result.max_drawdown_pct,
            sharpe_ratio: trade_sharpe(trades),

            initial_capital: result.starting_capital,
            final_capital: result.ending_capital,
            total_return_pct: total_return_pct(result.starting_capital, result.ending_capital),

            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),

            window_trades: window.len(),
            window_trades_pct: pct(window.len(), trades.len()),
            window_win_rate: win_rate_of(&window),

            trades: trades.clone(),
            equity_curve: result.equity_curve.clone(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percent of winning trades.
pub fn win_rate<'a>(trades: impl Iterator<Item = &'a Trade>) -> f64 {
    let (n, w) = trades.fold((0, 0), |(n, w), t| (n + 1, w + usize::from(t.is_winner())));
    pct(w, n)
}

fn win_rate_of(trades: &[&Trade]) -> f64 {
    win_rate(trades.iter().copied())
}

/// Trades per 30-day month.
pub fn trades_per_month(trades: usize, duration_days: i64) -> f64 {
    if duration_days <= 0 {
        return 0.0;
    }
    trades as f64 / (duration_days as f64 / 30.0)
}

/// Gross winning R over gross losing R, 0 when nothing was lost.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl_r).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| !t.is_winner())
        .map(|t| t.pnl_r)
        .sum::<f64>()
        .abs();
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else {
        0.0
    }
}

/// Probability-weighted average R, `win_rate` in percent.
pub fn expectancy(win_rate: f64, avg_win_r: f64, avg_loss_r: f64) -> f64 {
    let p = win_rate / 100.0;
    p * avg_win_r + (1.0 - p) * avg_loss_r
}

/// Mean over population standard deviation of per-trade R.
///
/// 0 with fewer than two trades or zero dispersion.
pub fn trade_sharpe(trades: &[Trade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_r).collect();
    let m = mean(&returns);
    let variance = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / returns.len() as f64;
    let std = variance.sqrt();
    if std > 0.0 {
        m / std
    } else {
        0.0
    }
}

pub fn total_return_pct(initial: f64, final_capital: f64) -> f64 {
    if initial > 0.0 {
        (final_capital - initial) / initial * 100.0
    } else {
        0.0
    }
}

/// Longest run of wins (or losses) walking the ledger in closing order.
pub fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
