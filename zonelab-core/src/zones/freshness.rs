//! Forward-consistency pass: the only writer of `touches`, `freshness`
//! and `broken_at`.
//!
//! For every zone, walk the bars strictly after its creation index:
//! - Demand: `low <= top && close > bottom` is a touch; `close < bottom` breaks.
//! - Supply: `high >= bottom && close < top` is a touch; `close > top` breaks.
//!
//! A break ends the walk for that zone.

use crate::domain::{Bar, Freshness, Zone, ZoneKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retest {
    Touch,
    Break,
    None,
}

fn classify(zone: &Zone, bar: &Bar) -> Retest {
    match zone.kind {
        ZoneKind::Demand => {
            if bar.low <= zone.top && bar.close > zone.bottom {
                Retest::Touch
            } else if bar.close < zone.bottom {
                Retest::Break
            } else {
                Retest::None
            }
        }
        ZoneKind::Supply => {
            if bar.high >= zone.bottom && bar.close < zone.top {
                Retest::Touch
            } else if bar.close > zone.top {
                Retest::Break
            } else {
                Retest::None
            }
        }
    }
}

/// Update every zone in place, addressing them by position in the slice.
pub fn apply_forward_pass(zones: &mut [Zone], bars: &[Bar]) {
    for zone in zones.iter_mut() {
        let start = zone.creation_index + 1;
        if start >= bars.len() {
            continue;
        }
        for (offset, bar) in bars[start..].iter().enumerate() {
            match classify(zone, bar) {
                Retest::Touch => {
                    zone.touches += 1;
                    zone.advance_freshness(Freshness::Tested);
                }
                Retest::Break => {
                    zone.advance_freshness(Freshness::Broken);
                    zone.broken_at = Some(start + offset);
                    break;
                }
                Retest::None => {}
            }
        }
    }
}
