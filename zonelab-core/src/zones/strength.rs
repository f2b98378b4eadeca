//! Zone strength score.
//!
//! strength = Σ weight × sub-score, each sub-score in [0, 1]:
//! - velocity: `min(velocity_atr / 5, 1)`
//! - time: `min(bars / 20, 1)`
//! - volume: `min(zone_volume / (trailing_mean × bars + 1e-8), 1)`, 0.5 without volume data
//! - touch: 0 at creation; the forward pass does not recompute it

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::ParameterError;

const VELOCITY_CAP_ATR: f64 = 5.0;
const TIME_CAP_BARS: f64 = 20.0;
const VOLUME_TRAILING_BARS: usize = 50;
const NEUTRAL_VOLUME_SCORE: f64 = 0.5;
const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthWeights {
    pub velocity: f64,
    pub time: f64,
    pub volume: f64,
    pub touch: f64,
}

impl Default for StrengthWeights {
    fn default() -> Self {
        Self {
            velocity: 0.3,
            time: 0.2,
            volume: 0.3,
            touch: 0.2,
        }
    }
}

impl StrengthWeights {
    /// Weights must be finite, non-negative, and sum to 1.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let all = [self.velocity, self.time, self.volume, self.touch];
        let sum: f64 = all.iter().sum();
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ParameterError::MalformedWeights { sum });
        }
        Ok(())
    }
}

/// Raw measurements of a freshly detected zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthInputs {
    /// Breakout displacement in ATR multiples.
    pub velocity_atr: f64,
    pub time_in_zone: usize,
    /// Summed consolidation volume, `None` when any bar lacks volume.
    pub volume: Option<f64>,
}

pub fn velocity_score(velocity_atr: f64) -> f64 {
    (velocity_atr / VELOCITY_CAP_ATR).clamp(0.0, 1.0)
}

pub fn time_score(time_in_zone: usize) -> f64 {
    (time_in_zone as f64 / TIME_CAP_BARS).min(1.0)
}

/// Zone volume relative to the mean volume of the 50 bars before
/// `creation_index`, scaled by the zone's duration.
pub fn volume_score(bars: &[Bar], creation_index: usize, inputs: &StrengthInputs) -> f64 {
    let Some(zone_volume) = inputs.volume else {
        return NEUTRAL_VOLUME_SCORE;
    };
    let start = creation_index.saturating_sub(VOLUME_TRAILING_BARS);
    let trailing = &bars[start..creation_index.min(bars.len())];
    let volumes: Option<Vec<f64>> = trailing.iter().map(|b| b.volume).collect();
    match volumes {
        Some(v) if !v.is_empty() => {
            let mean = v.iter().sum::<f64>() / v.len() as f64;
            let denom = mean * inputs.time_in_zone as f64 + 1e-8;
            (zone_volume / denom).clamp(0.0, 1.0)
        }
        _ => NEUTRAL_VOLUME_SCORE,
    }
}

pub fn strength_score(
    weights: &StrengthWeights,
    bars: &[Bar],
    creation_index: usize,
    inputs: &StrengthInputs,
) -> f64 {
    let touch_score = 0.0;
    let score = weights.velocity * velocity_score(inputs.velocity_atr)
        + weights.time * time_score(inputs.time_in_zone)
        + weights.volume * volume_score(bars, creation_index, inputs)
        + weights.touch * touch_score;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn default_weights_are_valid() {
        assert!(StrengthWeights::default().validate().is_ok());
    }

    #[test]
    fn malformed_weights_rejected() {
        let w = StrengthWeights {
            velocity: 0.5,
            ..StrengthWeights::default()
        };
        assert!(matches!(
            w.validate(),
            Err(ParameterError::MalformedWeights { .. })
        ));
        let w = StrengthWeights {
            velocity: -0.1,
            time: 0.4,
            volume: 0.5,
            touch: 0.2,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn sub_scores_cap() {
        assert_approx(velocity_score(2.5), 0.5, DEFAULT_EPSILON);
        assert_approx(velocity_score(12.0), 1.0, DEFAULT_EPSILON);
        assert_approx(time_score(13), 0.65, DEFAULT_EPSILON);
        assert_approx(time_score(40), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn missing_volume_is_neutral() {
        let inputs = StrengthInputs {
            velocity_atr: 5.0,
            time_in_zone: 20,
            volume: None,
        };
        let bars = make_bars(&[100.0; 60]);
        assert_approx(volume_score(&bars, 55, &inputs), 0.5, DEFAULT_EPSILON);
        // 0.3 * 1 + 0.2 * 1 + 0.3 * 0.5 + 0.2 * 0
        assert_approx(
            strength_score(&StrengthWeights::default(), &bars, 55, &inputs),
            0.65,
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn volume_relative_to_trailing_mean() {
        // every bar has volume 1000
        let bars = make_bars(&[100.0; 60]);
        let inputs = StrengthInputs {
            velocity_atr: 1.0,
            time_in_zone: 10,
            volume: Some(5_000.0),
        };
        assert_approx(volume_score(&bars, 55, &inputs), 0.5, 1e-9);
        let heavy = StrengthInputs {
            volume: Some(50_000.0),
            ..inputs
        };
        assert_approx(volume_score(&bars, 55, &heavy), 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn empty_trailing_window_is_neutral() {
        let bars = make_bars(&[100.0; 5]);
        let inputs = StrengthInputs {
            velocity_atr: 1.0,
            time_in_zone: 3,
            volume: Some(3_000.0),
        };
        assert_approx(volume_score(&bars, 0, &inputs), 0.5, DEFAULT_EPSILON);
    }
}
