//! Trade: a simulated zone-retest position and its exit state machine.
//!
//! ```text
//! Open ──TP1──▶ Tp1Hit ──TP2──▶ Tp2Hit
//!   │              └────SL────▶ SlHit   (stop possibly at breakeven)
//!   ├────SL──────────────────▶ SlHit
//!   └────TP2─────────────────▶ Tp2Hit
//! Open | Tp1Hit ──end of data──▶ EndOfData
//! ```
//!
//! P&L is expressed in R: price move divided by the risk at entry
//! (`|entry - initial_stop|`). Moving the stop to breakeven does not change R.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::trend::TrendState;
use super::zone::ZoneId;

/// Sequential trade identifier within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    /// Near target reached; remainder still open.
    Tp1Hit,
    Tp2Hit,
    SlHit,
    /// Force-closed at the final bar's close.
    EndOfData,
}

impl TradeStatus {
    pub fn is_open(self) -> bool {
        matches!(self, TradeStatus::Open | TradeStatus::Tp1Hit)
    }

    pub fn close_reason(self) -> Option<&'static str> {
        match self {
            TradeStatus::Open | TradeStatus::Tp1Hit => None,
            TradeStatus::Tp2Hit => Some("take_profit_2"),
            TradeStatus::SlHit => Some("stop_loss"),
            TradeStatus::EndOfData => Some("end_of_data"),
        }
    }
}

/// Price levels computed at entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeSetup {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub tp1: f64,
    pub tp2: f64,
}

/// How the near target is handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitPolicy {
    /// Fraction of the remaining size closed at TP1, in (0, 1).
    pub tp1_close_fraction: f64,
    pub breakeven_at_tp1: bool,
}

/// What happened to a trade on one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeEvent {
    /// TP1 reached: `closed_size` of the position was taken off at `r_multiple`.
    PartialExit { closed_size: f64, r_multiple: f64 },
    /// The trade reached a terminal state.
    Closed { status: TradeStatus },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub zone: ZoneId,
    pub direction: Direction,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_index: usize,
    pub entry_price: f64,

    // ── Levels ──
    pub stop_loss: f64,
    pub initial_stop: f64,
    pub tp1: f64,
    pub tp2: f64,

    // ── Size ──
    /// Fraction of capital at risk; only ever shrinks.
    pub position_size: f64,
    pub initial_position_size: f64,

    // ── State ──
    pub status: TradeStatus,
    pub tp1_hit_at: Option<NaiveDateTime>,

    // ── Exit ──
    pub exit_time: Option<NaiveDateTime>,
    pub exit_index: Option<usize>,
    pub exit_price: Option<f64>,

    // ── PnL ──
    /// R of the final exit, measured on the initial risk.
    pub pnl_r: f64,
    /// R banked on the fraction closed at TP1 (0 if TP1 never hit).
    pub partial_pnl_r: f64,

    // ── Excursion (price points) ──
    pub mae: f64,
    pub mfe: f64,

    // ── Context ──
    /// Originating zone was created inside a periodic time window.
    pub formed_in_window: bool,
    pub htf_trend: Option<TrendState>,
}

impl Trade {
    pub fn open(
        id: TradeId,
        zone: ZoneId,
        setup: TradeSetup,
        entry_time: NaiveDateTime,
        entry_index: usize,
        position_size: f64,
    ) -> Self {
        Self {
            id,
            zone,
            direction: setup.direction,
            entry_time,
            entry_index,
            entry_price: setup.entry_price,
            stop_loss: setup.stop_loss,
            initial_stop: setup.stop_loss,
            tp1: setup.tp1,
            tp2: setup.tp2,
            position_size,
            initial_position_size: position_size,
            status: TradeStatus::Open,
            tp1_hit_at: None,
            exit_time: None,
            exit_index: None,
            exit_price: None,
            pnl_r: 0.0,
            partial_pnl_r: 0.0,
            mae: 0.0,
            mfe: 0.0,
            formed_in_window: false,
            htf_trend: None,
        }
    }

    /// Distance from entry to the original stop.
    pub fn initial_risk(&self) -> f64 {
        (self.entry_price - self.initial_stop).abs()
    }

    /// R-multiple of exiting at `price`, zero when the initial risk is zero.
    pub fn r_multiple(&self, price: f64) -> f64 {
        let risk = self.initial_risk();
        if risk <= 0.0 {
            return 0.0;
        }
        let points = match self.direction {
            Direction::Long => price - self.entry_price,
            Direction::Short => self.entry_price - price,
        };
        points / risk
    }

    pub fn is_winner(&self) -> bool {
        self.pnl_r > 0.0
    }

    /// Advance the exit state machine by one bar.
    ///
    /// Checks run against the bar's extremes in a fixed order: stop-loss, far
    /// target, near target. A bar spanning both stop and target resolves as a
    /// stop.
    pub fn apply_bar(&mut self, bar: &Bar, index: usize, policy: &ExitPolicy) -> Option<TradeEvent> {
        if !self.status.is_open() {
            return None;
        }
        self.update_excursion(bar);

        let (stop_hit, tp2_hit, tp1_hit) = match self.direction {
            Direction::Long => (
                bar.low <= self.stop_loss,
                bar.high >= self.tp2,
                bar.high >= self.tp1,
            ),
            Direction::Short => (
                bar.high >= self.stop_loss,
                bar.low <= self.tp2,
                bar.low <= self.tp1,
            ),
        };

        if stop_hit {
            self.close(self.stop_loss, bar.timestamp, index, TradeStatus::SlHit);
            return Some(TradeEvent::Closed {
                status: TradeStatus::SlHit,
            });
        }
        if tp2_hit {
            self.close(self.tp2, bar.timestamp, index, TradeStatus::Tp2Hit);
            return Some(TradeEvent::Closed {
                status: TradeStatus::Tp2Hit,
            });
        }
        if tp1_hit && self.status == TradeStatus::Open {
            let closed_size = self.position_size * policy.tp1_close_fraction;
            self.position_size -= closed_size;
            self.partial_pnl_r = self.r_multiple(self.tp1);
            self.status = TradeStatus::Tp1Hit;
            self.tp1_hit_at = Some(bar.timestamp);
            if policy.breakeven_at_tp1 {
                self.stop_loss = self.entry_price;
            }
            return Some(TradeEvent::PartialExit {
                closed_size,
                r_multiple: self.partial_pnl_r,
            });
        }
        None
    }

    /// Close the trade. Only the first call has any effect.
    pub fn close(
        &mut self,
        exit_price: f64,
        exit_time: NaiveDateTime,
        exit_index: usize,
        status: TradeStatus,
    ) {
        if !self.status.is_open() {
            return;
        }
        debug_assert!(!status.is_open(), "close() requires a terminal status");
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self.exit_index = Some(exit_index);
        self.pnl_r = self.r_multiple(exit_price);
        self.status = status;
    }

    fn update_excursion(&mut self, bar: &Bar) {
        let (favorable, adverse) = match self.direction {
            Direction::Long => (bar.high - self.entry_price, bar.low - self.entry_price),
            Direction::Short => (self.entry_price - bar.low, self.entry_price - bar.high),
        };
        if favorable > 0.0 {
            self.mfe = self.mfe.max(favorable);
        }
        if adverse < 0.0 {
            self.mae = self.mae.min(adverse);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn bar(minute: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(ts(minute), close, high, low, close)
    }

    fn long_trade() -> Trade {
        Trade::open(
            TradeId(1),
            ZoneId(0),
            TradeSetup {
                direction: Direction::Long,
                entry_price: 100.0,
                stop_loss: 98.0,
                tp1: 101.0,
                tp2: 102.5,
            },
            ts(0),
            10,
            0.01,
        )
    }

    fn short_trade() -> Trade {
        Trade::open(
            TradeId(2),
            ZoneId(0),
            TradeSetup {
                direction: Direction::Short,
                entry_price: 100.0,
                stop_loss: 102.0,
                tp1: 99.0,
                tp2: 97.5,
            },
            ts(0),
            10,
            0.01,
        )
    }

    const POLICY: ExitPolicy = ExitPolicy {
        tp1_close_fraction: 0.5,
        breakeven_at_tp1: true,
    };

    #[test]
    fn long_stop_loss_is_minus_one_r() {
        let mut t = long_trade();
        let ev = t.apply_bar(&bar(5, 100.2, 97.5, 97.8), 11, &POLICY);
        assert_eq!(
            ev,
            Some(TradeEvent::Closed {
                status: TradeStatus::SlHit
            })
        );
        assert_eq!(t.exit_price, Some(98.0));
        assert!((t.pnl_r - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn tp1_then_breakeven_stop_is_zero_r() {
        let mut t = long_trade();
        let ev = t.apply_bar(&bar(5, 101.0, 100.1, 100.8), 11, &POLICY);
        assert!(matches!(ev, Some(TradeEvent::PartialExit { .. })));
        assert_eq!(t.status, TradeStatus::Tp1Hit);
        assert_eq!(t.stop_loss, 100.0);
        assert!((t.position_size - 0.005).abs() < 1e-12);
        assert!((t.partial_pnl_r - 0.5).abs() < 1e-12);

        t.apply_bar(&bar(10, 100.6, 99.5, 99.7), 12, &POLICY);
        assert_eq!(t.status, TradeStatus::SlHit);
        assert_eq!(t.exit_price, Some(100.0));
        assert_eq!(t.pnl_r, 0.0);
    }

    #[test]
    fn stop_wins_when_bar_spans_stop_and_target() {
        let mut t = long_trade();
        t.apply_bar(&bar(5, 103.0, 97.0, 100.0), 11, &POLICY);
        assert_eq!(t.status, TradeStatus::SlHit);
    }

    #[test]
    fn far_target_beats_near_target() {
        let mut t = long_trade();
        t.apply_bar(&bar(5, 102.6, 99.5, 102.4), 11, &POLICY);
        assert_eq!(t.status, TradeStatus::Tp2Hit);
        assert!((t.pnl_r - 1.25).abs() < 1e-12);
        assert_eq!(t.position_size, 0.01);
    }

    #[test]
    fn tp1_reduces_size_once() {
        let mut t = long_trade();
        t.apply_bar(&bar(5, 101.2, 100.1, 101.0), 11, &POLICY);
        t.apply_bar(&bar(10, 101.4, 100.2, 101.1), 12, &POLICY);
        assert!((t.position_size - 0.005).abs() < 1e-12);
        assert!(t.status.is_open());
    }

    #[test]
    fn short_mirrors_long() {
        let mut t = short_trade();
        t.apply_bar(&bar(5, 99.8, 98.9, 99.0), 11, &POLICY);
        assert_eq!(t.status, TradeStatus::Tp1Hit);
        assert_eq!(t.stop_loss, 100.0);
        t.apply_bar(&bar(10, 99.5, 97.4, 97.6), 12, &POLICY);
        assert_eq!(t.status, TradeStatus::Tp2Hit);
        assert!((t.pnl_r - 1.25).abs() < 1e-12);
    }

    #[test]
    fn close_happens_once() {
        let mut t = long_trade();
        t.close(99.0, ts(20), 15, TradeStatus::EndOfData);
        t.close(105.0, ts(25), 16, TradeStatus::Tp2Hit);
        assert_eq!(t.status, TradeStatus::EndOfData);
        assert_eq!(t.exit_price, Some(99.0));
        assert!(t.apply_bar(&bar(30, 110.0, 90.0, 100.0), 17, &POLICY).is_none());
    }

    #[test]
    fn zero_risk_guards_to_zero_r() {
        let mut t = long_trade();
        t.initial_stop = t.entry_price;
        assert_eq!(t.r_multiple(105.0), 0.0);
    }

    #[test]
    fn excursions_track_bar_extremes() {
        let mut t = long_trade();
        t.apply_bar(&bar(5, 100.8, 99.2, 100.0), 11, &POLICY);
        assert!((t.mfe - 0.8).abs() < 1e-12);
        assert!((t.mae - (-0.8)).abs() < 1e-12);
    }
}
