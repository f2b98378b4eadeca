//! Retest detection and trade setup.
//!
//! A zone qualifies at bar `i` when its age is within
//! `[min_zone_age, max_zone_age]`, its confirmation window has printed, and it
//! is not broken. With `break_as_of_bar` a zone counts as broken only from the
//! bar after its break; otherwise its final freshness decides. The first
//! qualifying zone in emission order whose retest condition holds opens the
//! trade.

use crate::domain::{Bar, Direction, Freshness, TradeSetup, TrendDirection, TrendState, Zone, ZoneKind};

use super::config::BacktestConfig;

/// Whether `zone` may be traded at bar `index`.
pub fn is_tradable(zone: &Zone, index: usize, config: &BacktestConfig) -> bool {
    let age = zone.age(index);
    index >= zone.creation_index
        && age >= config.min_zone_age
        && age <= config.max_zone_age
        && zone.is_available(index)
        && !is_broken(zone, index, config)
}

fn is_broken(zone: &Zone, index: usize, config: &BacktestConfig) -> bool {
    if config.break_as_of_bar {
        zone.is_broken_before(index)
    } else {
        zone.freshness == Freshness::Broken
    }
}

/// Retest condition of `bar` against `zone`, honoring the trend filter.
pub fn retest_direction(
    zone: &Zone,
    bar: &Bar,
    trend: &TrendState,
    config: &BacktestConfig,
) -> Option<Direction> {
    let (touched, direction, required) = match zone.kind {
        ZoneKind::Demand => (
            bar.low <= zone.top && bar.close > zone.bottom,
            Direction::Long,
            TrendDirection::Bullish,
        ),
        ZoneKind::Supply => (
            bar.high >= zone.bottom && bar.close < zone.top,
            Direction::Short,
            TrendDirection::Bearish,
        ),
    };
    if !touched {
        return None;
    }
    if config.enable_trend_filter && trend.direction != required {
        return None;
    }
    Some(direction)
}

/// Entry at the near boundary, stop beyond the far boundary, targets from entry.
pub fn trade_setup(zone: &Zone, direction: Direction, atr: f64, config: &BacktestConfig) -> TradeSetup {
    match direction {
        Direction::Long => {
            let entry = zone.top;
            TradeSetup {
                direction,
                entry_price: entry,
                stop_loss: zone.bottom - atr * config.sl_atr,
                tp1: entry + atr * config.tp1_atr,
                tp2: entry + atr * config.tp2_atr,
            }
        }
        Direction::Short => {
            let entry = zone.bottom;
            TradeSetup {
                direction,
                entry_price: entry,
                stop_loss: zone.top + atr * config.sl_atr,
                tp1: entry - atr * config.tp1_atr,
                tp2: entry - atr * config.tp2_atr,
            }
        }
    }
}

/// Scan `candidates` (indices into `zones`, emission order) for the first retest.
pub fn find_retest<'a>(
    zones: &'a [Zone],
    candidates: &[usize],
    bar: &Bar,
    index: usize,
    trend: &TrendState,
    config: &BacktestConfig,
) -> Option<(&'a Zone, Direction)> {
    candidates
        .iter()
        .filter_map(|&z| zones.get(z))
        .filter(|zone| is_tradable(zone, index, config))
        .find_map(|zone| retest_direction(zone, bar, trend, config).map(|d| (zone, d)))
}
