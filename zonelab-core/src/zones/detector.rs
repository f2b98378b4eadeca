//! Consolidation-then-breakout zone detection.
//!
//! For every index `i >= lookback`:
//!
//! ```text
//!   [ consolidation: min_consolidation + 10 bars ][ breakout: up to 5 bars ]
//!    i-mc-10 ..................................i-1  i ............ i+4
//! ```
//!
//! 1. reject if the consolidation range exceeds 1.5 × ATR at its last bar
//! 2. velocity = larger of (max breakout high − consolidation close) and
//!    (consolidation close − min breakout low)
//! 3. reject if velocity < `min_velocity_atr` × ATR
//! 4. demand when the bullish move is larger, else supply; the zone is
//!    `zone_width_atr` × ATR tall, anchored at the consolidation low (demand)
//!    or high (supply)
//!
//! Bars whose ATR is not ready are skipped. Zones are confirmed only once the
//! breakout window has printed; `Zone::available_from` records that index.

use serde::{Deserialize, Serialize};

use super::freshness::apply_forward_pass;
use super::strength::{strength_score, StrengthInputs, StrengthWeights};
use crate::domain::{Bar, Freshness, Zone, ZoneId, ZoneKind};
use crate::error::{ensure_length, ensure_positive, ParameterError};
use crate::indicators::{value_at, Atr, Indicator};

/// Bars added to `min_consolidation` to size the consolidation window.
pub const CONSOLIDATION_MARGIN: usize = 10;
/// Maximum breakout window length.
pub const BREAKOUT_WINDOW: usize = 5;
/// Widest consolidation range accepted, in ATR multiples.
pub const MAX_CONSOLIDATION_RANGE_ATR: f64 = 1.5;

/// Zone-shape thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneShape {
    pub min_consolidation: usize,
    pub zone_width_atr: f64,
    pub min_velocity_atr: f64,
}

impl Default for ZoneShape {
    fn default() -> Self {
        Self {
            min_consolidation: 3,
            zone_width_atr: 0.5,
            min_velocity_atr: 1.0,
        }
    }
}

/// Detector settings that rarely change between runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// First index scanned.
    pub lookback: usize,
    pub atr_period: usize,
    /// Age limit used by `active_zones(.., only_fresh = true)`.
    pub freshness_max_age: usize,
    pub weights: StrengthWeights,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            lookback: 100,
            atr_period: 14,
            freshness_max_age: 50,
            weights: StrengthWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDetector {
    shape: ZoneShape,
    params: DetectorParams,
}

impl Default for ZoneDetector {
    fn default() -> Self {
        Self {
            shape: ZoneShape::default(),
            params: DetectorParams::default(),
        }
    }
}

impl ZoneDetector {
    pub fn new(shape: ZoneShape, params: DetectorParams) -> Result<Self, ParameterError> {
        ensure_positive("zone_width_atr", shape.zone_width_atr)?;
        ensure_positive("min_velocity_atr", shape.min_velocity_atr)?;
        ensure_length("atr_period", params.atr_period)?;
        params.weights.validate()?;
        Ok(Self { shape, params })
    }

    pub fn shape(&self) -> &ZoneShape {
        &self.shape
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Length of the consolidation window in bars.
    pub fn consolidation_len(&self) -> usize {
        self.shape.min_consolidation + CONSOLIDATION_MARGIN
    }

    /// Scan `bars` and return zones in emission order, after the forward pass.
    ///
    /// Deterministic: the same bars and settings always give the same list.
    pub fn detect(&self, bars: &[Bar]) -> Vec<Zone> {
        let atr = Atr::new(self.params.atr_period).compute(bars);
        let mut zones = Vec::new();

        for i in self.params.lookback..bars.len() {
            if let Some(zone) = self.candidate_at(bars, &atr, i, ZoneId(zones.len())) {
                zones.push(zone);
            }
        }

        apply_forward_pass(&mut zones, bars);

        tracing::debug!(
            bars = bars.len(),
            zones = zones.len(),
            demand = zones.iter().filter(|z| z.kind == ZoneKind::Demand).count(),
            "zone detection complete"
        );
        zones
    }

    /// Evaluate the candidate whose consolidation window ends at `i - 1`.
    fn candidate_at(&self, bars: &[Bar], atr: &[f64], i: usize, id: ZoneId) -> Option<Zone> {
        let len = self.consolidation_len();
        let start = i.checked_sub(len)?;
        let end = i.checked_sub(1)?;
        let consolidation = &bars[start..=end];

        let atr_value = value_at(atr, end).filter(|a| *a > 0.0)?;

        let high = consolidation
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let low = consolidation
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        if high - low > MAX_CONSOLIDATION_RANGE_ATR * atr_value {
            return None;
        }

        let breakout_end = (end + BREAKOUT_WINDOW).min(bars.len() - 1);
        let breakout = &bars[end + 1..=breakout_end];
        let base_close = consolidation[consolidation.len() - 1].close;
        let breakout_high = breakout
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let breakout_low = breakout
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);

        let bullish = breakout_high - base_close;
        let bearish = base_close - breakout_low;
        let velocity = bullish.max(bearish);
        if velocity < self.shape.min_velocity_atr * atr_value {
            return None;
        }

        let height = self.shape.zone_width_atr * atr_value;
        let (kind, top, bottom) = if bullish > bearish {
            (ZoneKind::Demand, low + height, low)
        } else {
            (ZoneKind::Supply, high, high - height)
        };

        let volume: Option<f64> = consolidation.iter().map(|b| b.volume).sum();
        let inputs = StrengthInputs {
            velocity_atr: velocity / atr_value,
            time_in_zone: consolidation.len(),
            volume,
        };

        Some(Zone {
            id,
            kind,
            top,
            bottom,
            created_at: bars[end].timestamp,
            creation_index: end,
            available_from: breakout_end,
            touches: 0,
            freshness: Freshness::Fresh,
            broken_at: None,
            strength: strength_score(&self.params.weights, bars, end, &inputs),
            velocity: inputs.velocity_atr,
            volume: volume.unwrap_or(0.0),
            time_in_zone: inputs.time_in_zone,
        })
    }

    /// Zones not broken. With `only_fresh`, further restricted to untested
    /// zones no older than `freshness_max_age` bars at `current_index`.
    pub fn active_zones<'a>(
        &self,
        zones: &'a [Zone],
        current_index: usize,
        only_fresh: bool,
    ) -> Vec<&'a Zone> {
        zones
            .iter()
            .filter(|z| z.freshness != Freshness::Broken)
            .filter(|z| !only_fresh || z.is_fresh(current_index, self.params.freshness_max_age))
            .collect()
    }
}
