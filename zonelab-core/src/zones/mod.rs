//! Supply and demand zones: detection, strength, forward pass, summaries.

pub mod detector;
pub mod freshness;
pub mod strength;

pub use detector::{DetectorParams, ZoneDetector, ZoneShape};
pub use freshness::apply_forward_pass;
pub use strength::{StrengthInputs, StrengthWeights};

use serde::{Deserialize, Serialize};

use crate::domain::{Freshness, Zone, ZoneKind};

/// Zone counts by kind and freshness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub total: usize,
    pub supply: usize,
    pub demand: usize,
    pub fresh: usize,
    pub tested: usize,
    pub broken: usize,
}

impl ZoneSummary {
    pub fn from_zones(zones: &[Zone]) -> Self {
        zones.iter().fold(
            Self {
                total: zones.len(),
                ..Self::default()
            },
            |mut s, z| {
                match z.kind {
                    ZoneKind::Supply => s.supply += 1,
                    ZoneKind::Demand => s.demand += 1,
                }
                match z.freshness {
                    Freshness::Fresh => s.fresh += 1,
                    Freshness::Tested => s.tested += 1,
                    Freshness::Broken => s.broken += 1,
                }
                s
            },
        )
    }
}

/// The `n` strongest zones, strongest first. Ties keep emission order.
pub fn strongest(zones: &[Zone], n: usize) -> Vec<&Zone> {
    let mut sorted: Vec<&Zone> = zones.iter().collect();
    sorted.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    sorted.truncate(n);
    sorted
}
