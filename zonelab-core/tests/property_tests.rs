//! Property tests for detector and engine invariants.
//!
//! Uses proptest to verify:
//! 1. Zone geometry: top above bottom, strength in [0, 1], freshness consistent
//! 2. Detection purity: identical inputs give identical zone lists
//! 3. Trade state machine: size never grows, stop never loosens, closes once
//! 4. Engine limits: trade caps hold, broken zones are never traded
//! 5. Resampling conserves extremes, volume, first open and last close

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use zonelab_core::data::{resample, BucketLabel};
use zonelab_core::domain::{
    Bar, Direction, ExitPolicy, Freshness, Trade, TradeId, TradeSetup, TradeStatus, ZoneId,
};
use zonelab_core::engine::{run_backtest, BacktestConfig};
use zonelab_core::trend::TrendParams;
use zonelab_core::zones::{DetectorParams, ZoneDetector, ZoneShape};

// ── Helpers ──────────────────────────────────────────────────────────

/// 5-minute bars from a list of steps. Steps beyond ±0.9 become jumps so
/// that quiet stretches and breakouts both occur.
fn walk(steps: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut prev = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let scale = if s.abs() > 0.9 { 8.0 } else { 0.3 };
            let close = (prev + s * scale).max(1.0);
            let wick = 0.1 + s.abs() * 0.2;
            let bar = Bar::new(
                base + Duration::minutes(5 * i as i64),
                prev,
                prev.max(close) + wick,
                prev.min(close) - wick,
                close,
            )
            .with_volume(1000.0 + 500.0 * s.abs());
            prev = close;
            bar
        })
        .collect()
}

fn small_detector() -> ZoneDetector {
    ZoneDetector::new(
        ZoneShape {
            min_consolidation: 0,
            ..ZoneShape::default()
        },
        DetectorParams {
            lookback: 20,
            atr_period: 5,
            ..DetectorParams::default()
        },
    )
    .unwrap()
}

fn engine_config(max_open: usize, max_per_day: usize) -> BacktestConfig {
    BacktestConfig {
        min_consolidation: 0,
        enable_time_filter: false,
        enable_trend_filter: false,
        min_zone_age: 1,
        max_open_trades: max_open,
        max_trades_per_day: max_per_day,
        warmup_bars: 20,
        min_htf_history: 0,
        detector: DetectorParams {
            lookback: 20,
            atr_period: 5,
            ..DetectorParams::default()
        },
        trend: TrendParams {
            adx_period: 3,
            ..TrendParams::default()
        },
        ..BacktestConfig::default()
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_steps() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0..1.0_f64, 150..400)
}

/// (high offset, low offset, close offset) around a 100.0 entry.
fn arb_bar_moves() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((0.0..6.0_f64, 0.0..4.0_f64, -3.0..5.0_f64), 1..40)
}

// ── 1. Zone geometry ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn zones_are_well_formed(steps in arb_steps()) {
        let bars = walk(&steps);
        for z in small_detector().detect(&bars) {
            prop_assert!(z.top > z.bottom);
            prop_assert!((0.0..=1.0).contains(&z.strength));
            prop_assert!(z.creation_index < z.available_from);
            prop_assert!(z.available_from < bars.len());
            prop_assert_eq!(z.created_at, bars[z.creation_index].timestamp);
            match z.freshness {
                Freshness::Fresh => {
                    prop_assert_eq!(z.touches, 0);
                    prop_assert!(z.broken_at.is_none());
                }
                Freshness::Tested => {
                    prop_assert!(z.touches > 0);
                    prop_assert!(z.broken_at.is_none());
                }
                Freshness::Broken => {
                    let at = z.broken_at.unwrap();
                    prop_assert!(at > z.creation_index && at < bars.len());
                }
            }
        }
    }
}

// ── 2. Purity ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn detection_is_pure(steps in arb_steps()) {
        let bars = walk(&steps);
        let det = small_detector();
        prop_assert_eq!(det.detect(&bars), det.detect(&bars));
    }
}

// ── 3. Trade state machine ───────────────────────────────────────────

proptest! {
    #[test]
    fn trade_size_and_stop_are_monotonic(moves in arb_bar_moves()) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut trade = Trade::open(
            TradeId(1),
            ZoneId(0),
            TradeSetup {
                direction: Direction::Long,
                entry_price: 100.0,
                stop_loss: 98.0,
                tp1: 102.0,
                tp2: 105.0,
            },
            base,
            0,
            0.01,
        );
        let policy = ExitPolicy {
            tp1_close_fraction: 0.5,
            breakeven_at_tp1: true,
        };
        let mut closed_status = None;

        for (i, (up, down, c)) in moves.iter().enumerate() {
            let close = (100.0 + c).clamp(100.0 - down, 100.0 + up);
            let ts = base + Duration::minutes(5 * (i as i64 + 1));
            let bar = Bar::new(ts, close, 100.0 + up, 100.0 - down, close);
            let size_before = trade.position_size;
            let stop_before = trade.stop_loss;
            trade.apply_bar(&bar, i + 1, &policy);

            prop_assert!(trade.position_size <= size_before);
            prop_assert!(trade.position_size > 0.0);
            prop_assert!(trade.stop_loss >= stop_before);
            prop_assert!(trade.stop_loss >= trade.initial_stop);
            if let Some(status) = closed_status {
                prop_assert_eq!(trade.status, status);
            } else if !trade.status.is_open() {
                closed_status = Some(trade.status);
            }
        }
        if trade.tp1_hit_at.is_some() {
            prop_assert!((trade.position_size - 0.005).abs() < 1e-12);
        } else {
            prop_assert_ne!(trade.status, TradeStatus::Tp1Hit);
        }
    }
}

// ── 4. Engine limits ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn engine_respects_trade_limits(
        steps in arb_steps(),
        max_open in 1..3_usize,
        max_per_day in 1..4_usize,
    ) {
        let bars = walk(&steps);
        let htf = resample(&bars, 60, BucketLabel::End).unwrap();
        let config = engine_config(max_open, max_per_day);
        let result = run_backtest(&bars, &htf, &config).unwrap();

        prop_assert_eq!(result.equity_curve.len(), result.bars_processed);
        for point in &result.equity_curve {
            prop_assert!(point.open_trades <= max_open);
            prop_assert!(point.drawdown_pct >= 0.0);
        }

        let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
        for t in &result.trades {
            *per_day.entry(t.entry_time.date()).or_default() += 1;
            prop_assert!(!t.status.is_open());
            prop_assert!(t.exit_index.unwrap() >= t.entry_index);
            prop_assert!(t.position_size > 0.0);
            prop_assert!(t.position_size <= t.initial_position_size);

            let zone = &result.zones[t.zone.0];
            let age = t.entry_index - zone.creation_index;
            prop_assert!(age >= config.min_zone_age && age <= config.max_zone_age);
            prop_assert!(t.entry_index >= zone.available_from);
            prop_assert_ne!(zone.freshness, Freshness::Broken);
        }
        for count in per_day.values() {
            prop_assert!(*count <= max_per_day);
        }
        prop_assert!(result.max_drawdown_pct >= 0.0);
    }
}

// ── 5. Resampling ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn resampling_conserves_aggregates(
        steps in arb_steps(),
        minutes in prop::sample::select(vec![15_u32, 30, 60, 240]),
    ) {
        let bars = walk(&steps);
        let out = resample(&bars, minutes, BucketLabel::Start).unwrap();

        prop_assert!(!out.is_empty());
        prop_assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        prop_assert_eq!(out[0].open, bars[0].open);
        prop_assert_eq!(out[out.len() - 1].close, bars[bars.len() - 1].close);

        let max_in = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let max_out = out.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min_in = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let min_out = out.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        prop_assert_eq!(max_in, max_out);
        prop_assert_eq!(min_in, min_out);

        let vol_in: f64 = bars.iter().filter_map(|b| b.volume).sum();
        let vol_out: f64 = out.iter().filter_map(|b| b.volume).sum();
        prop_assert!((vol_in - vol_out).abs() < 1e-6 * vol_in.max(1.0));
        prop_assert!(out.iter().all(Bar::is_sane));
    }
}
