use std::path::PathBuf;
use std::sync::Arc;

use blockdag_core::{DagConfig, FixedClock, Ledger};
use rand::Rng;
use tempfile::{tempdir, TempDir};

pub const T0: u64 = 1_600_000_000_000;

pub const GENESIS_HEX: &str = "e29d974c513a7312a03eb59f4dd4661e736c32cbdff3e9e5d8688ffafb109af5";

pub fn fixed_ledger() -> Ledger {
    Ledger::with_clock(Arc::new(FixedClock(T0)))
}

pub fn tx(s: &str) -> Vec<Vec<u8>> {
    vec![s.as_bytes().to_vec()]
}

/// A payload of 1..=4 random transactions, each up to 64 bytes.
pub fn random_payload<R: Rng>(rng: &mut R) -> Vec<Vec<u8>> {
    let count = rng.gen_range(1..=4);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(0..=64);
            (0..len).map(|_| rng.gen()).collect()
        })
        .collect()
}

pub fn write_temp_config(config: &DagConfig) -> (TempDir, PathBuf) {
    // Create a temporary directory for the config file
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("dag.json");
    let json = serde_json::to_string_pretty(config).expect("Failed to encode config");
    std::fs::write(&path, json).expect("Failed to write config");
    (temp_dir, path)
}
