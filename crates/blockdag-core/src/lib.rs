//! Core of a content-addressed block DAG: sealing blocks, tracking tips and
//! checking the integrity of the whole graph.

pub mod block;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod store;
pub mod validate;

pub use block::Block;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::DagConfig;
pub use error::{ConfigError, InsertError, RestoreError};
pub use hash::{canonical_bytes, compute_hash, BlockHash, Hash};
pub use ledger::{AllBlocks, Ledger};
pub use store::DagStore;
pub use validate::{ValidationReport, Validator, Violation};
