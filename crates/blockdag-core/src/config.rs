use crate::constants::GENESIS_TRANSACTION;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a new DAG. Every field has a default, so `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Fixed genesis timestamp (unix ms). `None` takes it from the store's clock.
    pub genesis_timestamp: Option<u64>,
    /// Genesis transactions, stored as their UTF-8 bytes.
    pub genesis_payload: Vec<String>,
    /// Recompute block hashes on the rayon pool during validation.
    pub parallel_validation: bool,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: None,
            genesis_payload: vec![GENESIS_TRANSACTION.to_string()],
            parallel_validation: true,
        }
    }
}

impl DagConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub(crate) fn genesis_payload_bytes(&self) -> Vec<Vec<u8>> {
        self.genesis_payload
            .iter()
            .map(|tx| tx.as_bytes().to_vec())
            .collect()
    }
}
