//! Run fingerprinting: deterministic identity of a (data, configuration) pair.
//!
//! - `config_hash`: BLAKE3 over the canonical JSON of the `BacktestConfig`
//! - `dataset_hash`: BLAKE3 over the bars (see `data_loader::dataset_hash`)
//! - `run_id`: BLAKE3 over both plus the instrument and higher timeframe
//!
//! Two runs with the same `run_id` produce identical results.

use serde::{Deserialize, Serialize};

use zonelab_core::BacktestConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: String,
    pub config_hash: String,
    pub dataset_hash: String,
    pub instrument: String,
    pub htf_minutes: u32,
    pub has_synthetic: bool,
}

/// BLAKE3 of the configuration's JSON form. Struct fields serialize in
/// declaration order, so the encoding is canonical.
pub fn config_hash(config: &BacktestConfig) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(config)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

impl RunFingerprint {
    pub fn new(
        config: &BacktestConfig,
        dataset_hash: &str,
        instrument: &str,
        htf_minutes: u32,
        has_synthetic: bool,
    ) -> Result<Self, serde_json::Error> {
        let config_hash = config_hash(config)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(config_hash.as_bytes());
        hasher.update(dataset_hash.as_bytes());
        hasher.update(instrument.as_bytes());
        hasher.update(&htf_minutes.to_le_bytes());
        Ok(Self {
            run_id: hasher.finalize().to_hex().to_string(),
            config_hash,
            dataset_hash: dataset_hash.to_string(),
            instrument: instrument.to_string(),
            htf_minutes,
            has_synthetic,
        })
    }

    /// First 12 hex characters of the run id, for directory names.
    pub fn short_id(&self) -> &str {
        self.run_id.get(..12).unwrap_or(&self.run_id)
    }
}
