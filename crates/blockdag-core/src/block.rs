use crate::hash::{compute_hash, BlockHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A sealed DAG block. Fields are private; the hash is fixed at sealing time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    payload: Vec<Vec<u8>>,
    parents: BTreeSet<BlockHash>,
    hash: BlockHash,
}

impl Block {
    pub fn seal(
        index: u64,
        timestamp: u64,
        payload: Vec<Vec<u8>>,
        parents: BTreeSet<BlockHash>,
    ) -> Self {
        let hash = compute_hash(index, timestamp, &payload, &parents);
        Self {
            index,
            timestamp,
            payload,
            parents,
            hash,
        }
    }

    /// Reassemble a block that was sealed elsewhere (decoded from storage or
    /// the wire). The given hash is kept as-is; use [`Block::has_valid_hash`]
    /// or the validator to check it.
    pub fn from_parts(
        index: u64,
        timestamp: u64,
        payload: Vec<Vec<u8>>,
        parents: BTreeSet<BlockHash>,
        hash: BlockHash,
    ) -> Self {
        Self {
            index,
            timestamp,
            payload,
            parents,
            hash,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn payload(&self) -> &[Vec<u8>] {
        &self.payload
    }

    pub fn parents(&self) -> &BTreeSet<BlockHash> {
        &self.parents
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn recompute_hash(&self) -> BlockHash {
        compute_hash(self.index, self.timestamp, &self.payload, &self.parents)
    }

    pub fn has_valid_hash(&self) -> bool {
        self.recompute_hash() == self.hash
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Block {}

impl std::hash::Hash for Block {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
