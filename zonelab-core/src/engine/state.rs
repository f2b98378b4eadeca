//! Mutable run state and the run result.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, EquityPoint, ExitPolicy, Trade, TradeEvent, TradeId, TradeStatus, Zone};

/// State that evolves bar by bar. Owned by exactly one run.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Realized capital.
    pub capital: f64,
    pub peak_equity: f64,
    pub max_drawdown_pct: f64,
    /// Trades in `Open` or `Tp1Hit`, in entry order.
    pub open_trades: Vec<Trade>,
    /// Closed trades in closing order.
    pub closed_trades: Vec<Trade>,
    pub trades_today: usize,
    pub current_date: Option<NaiveDate>,
    next_trade_id: u64,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            peak_equity: initial_capital,
            max_drawdown_pct: 0.0,
            open_trades: Vec::new(),
            closed_trades: Vec::new(),
            trades_today: 0,
            current_date: None,
            next_trade_id: 0,
        }
    }

    pub fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId(self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    /// Reset the per-day entry counter when the calendar date changes.
    pub fn roll_date(&mut self, date: NaiveDate) {
        if self.current_date != Some(date) {
            self.current_date = Some(date);
            self.trades_today = 0;
        }
    }

    pub fn open_trade(&mut self, trade: Trade) {
        tracing::debug!(
            trade = trade.id.0,
            zone = %trade.zone,
            direction = ?trade.direction,
            entry = trade.entry_price,
            stop = trade.stop_loss,
            "trade opened"
        );
        self.open_trades.push(trade);
        self.trades_today += 1;
    }

    /// Run every open trade through `bar`, realize P&L into capital, and move
    /// closed trades to the ledger.
    pub fn update_open_trades(&mut self, bar: &Bar, index: usize, policy: &ExitPolicy) {
        for trade in self.open_trades.iter_mut() {
            match trade.apply_bar(bar, index, policy) {
                Some(TradeEvent::PartialExit {
                    closed_size,
                    r_multiple,
                }) => {
                    self.capital += r_multiple * self.capital * closed_size;
                    tracing::debug!(trade = trade.id.0, r = r_multiple, "tp1 hit");
                }
                Some(TradeEvent::Closed { status }) => {
                    self.capital += trade.pnl_r * self.capital * trade.position_size;
                    tracing::debug!(trade = trade.id.0, ?status, r = trade.pnl_r, "trade closed");
                }
                None => {}
            }
        }
        self.sweep_closed();
    }

    /// Force-close everything still open at `bar`'s close.
    pub fn close_all(&mut self, bar: &Bar, index: usize) {
        for trade in self.open_trades.iter_mut() {
            trade.close(bar.close, bar.timestamp, index, TradeStatus::EndOfData);
            self.capital += trade.pnl_r * self.capital * trade.position_size;
            tracing::debug!(trade = trade.id.0, r = trade.pnl_r, "closed at end of data");
        }
        self.sweep_closed();
    }

    fn sweep_closed(&mut self) {
        if self.open_trades.iter().all(|t| t.status.is_open()) {
            return;
        }
        let (open, closed): (Vec<Trade>, Vec<Trade>) = std::mem::take(&mut self.open_trades)
            .into_iter()
            .partition(|t| t.status.is_open());
        self.open_trades = open;
        self.closed_trades.extend(closed);
    }

    /// Realized capital plus R-based unrealized P&L of open trades at `price`.
    pub fn equity_at(&self, price: f64) -> f64 {
        self.capital
            + self
                .open_trades
                .iter()
                .map(|t| t.r_multiple(price) * self.capital * t.position_size)
                .sum::<f64>()
    }

    /// Append the bar's equity point and update peak and drawdown.
    pub fn mark(&mut self, bar: &Bar) -> EquityPoint {
        let equity = self.equity_at(bar.close);
        self.peak_equity = self.peak_equity.max(equity);
        let drawdown_pct = if self.peak_equity > 0.0 {
            (self.peak_equity - equity) / self.peak_equity * 100.0
        } else {
            0.0
        };
        self.max_drawdown_pct = self.max_drawdown_pct.max(drawdown_pct);
        EquityPoint {
            timestamp: bar.timestamp,
            equity,
            drawdown_pct,
            closed_trades: self.closed_trades.len(),
            open_trades: self.open_trades.len(),
        }
    }
}

/// Everything a run produces, as plain data for the reporting layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Every detected zone in emission order, after the forward pass.
    pub zones: Vec<Zone>,
    /// Zones that passed the time-window filter (all zones when it is off).
    pub eligible_zones: usize,
    /// Closed trades in closing order.
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Lower-timeframe bars supplied.
    pub bars: usize,
    /// Bars that were simulated (warmup and missing trend context excluded).
    pub bars_processed: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub starting_capital: f64,
    /// Realized capital after the end-of-data close.
    pub ending_capital: f64,
    pub max_drawdown_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, TradeSetup, ZoneId};
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn long(state: &mut EngineState) -> Trade {
        Trade::open(
            state.next_trade_id(),
            ZoneId(0),
            TradeSetup {
                direction: Direction::Long,
                entry_price: 100.0,
                stop_loss: 98.0,
                tp1: 101.0,
                tp2: 102.5,
            },
            ts(0),
            0,
            0.01,
        )
    }

    const POLICY: ExitPolicy = ExitPolicy {
        tp1_close_fraction: 0.5,
        breakeven_at_tp1: true,
    };

    #[test]
    fn stop_loss_costs_one_percent() {
        let mut s = EngineState::new(10_000.0);
        let t = long(&mut s);
        s.open_trade(t);
        s.update_open_trades(&Bar::new(ts(5), 99.0, 99.5, 97.5, 98.0), 1, &POLICY);
        assert!(s.open_trades.is_empty());
        assert_eq!(s.closed_trades.len(), 1);
        assert!((s.capital - 9_900.0).abs() < 1e-9);
    }

    #[test]
    fn partial_profit_is_banked() {
        let mut s = EngineState::new(10_000.0);
        let t = long(&mut s);
        s.open_trade(t);
        s.update_open_trades(&Bar::new(ts(5), 100.5, 101.0, 100.2, 100.8), 1, &POLICY);
        // 0.5 R on half of 1%
        assert!((s.capital - 10_025.0).abs() < 1e-9);
        assert_eq!(s.open_trades.len(), 1);
        // breakeven exit adds nothing
        s.update_open_trades(&Bar::new(ts(10), 100.5, 100.6, 99.5, 99.7), 2, &POLICY);
        assert!((s.capital - 10_025.0).abs() < 1e-9);
        assert!(s.open_trades.is_empty());
    }

    #[test]
    fn equity_includes_unrealized() {
        let mut s = EngineState::new(10_000.0);
        let t = long(&mut s);
        s.open_trade(t);
        // +1R on 1% of capital
        assert!((s.equity_at(102.0) - 10_100.0).abs() < 1e-9);
        let point = s.mark(&Bar::new(ts(5), 100.0, 100.5, 99.0, 99.0));
        assert!((point.equity - 9_950.0).abs() < 1e-9);
        assert!((point.drawdown_pct - 0.5).abs() < 1e-9);
        assert_eq!(point.open_trades, 1);
    }

    #[test]
    fn daily_counter_resets() {
        let mut s = EngineState::new(1.0);
        s.roll_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        s.trades_today = 3;
        s.roll_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(s.trades_today, 3);
        s.roll_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(s.trades_today, 0);
    }

    #[test]
    fn end_of_data_closes_in_entry_order() {
        let mut s = EngineState::new(10_000.0);
        let a = long(&mut s);
        let b = long(&mut s);
        s.open_trade(a);
        s.open_trade(b);
        s.close_all(&Bar::new(ts(30), 101.0, 101.0, 101.0, 101.0), 5);
        assert_eq!(s.closed_trades.len(), 2);
        assert_eq!(s.closed_trades[0].id, TradeId(0));
        assert!(s
            .closed_trades
            .iter()
            .all(|t| t.status == TradeStatus::EndOfData));
    }
}
