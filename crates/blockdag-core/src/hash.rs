use crate::constants::{HASH_HEX_SIZE, HASH_SIZE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub type Hash = [u8; HASH_SIZE];

/// Content address of a block. Shown and serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockHash(pub Hash);

impl BlockHash {
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<Hash> for BlockHash {
    fn from(bytes: Hash) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl FromStr for BlockHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_HEX_SIZE {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut out = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl TryFrom<String> for BlockHash {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockHash> for String {
    fn from(hash: BlockHash) -> Self {
        hash.to_hex()
    }
}

/// Canonical byte layout hashed for a block. Every integer is a little-endian
/// `u64`; payload entries and the parent list are count-prefixed and each
/// payload entry is length-prefixed:
///
/// `index | timestamp | n_tx | (len | tx)* | n_parents | parent*`
///
/// Parents are written in `BlockHash` order, which a `BTreeSet` already gives.
pub fn canonical_bytes(
    index: u64,
    timestamp: u64,
    payload: &[Vec<u8>],
    parents: &BTreeSet<BlockHash>,
) -> Vec<u8> {
    let payload_len: usize = payload.iter().map(|tx| 8 + tx.len()).sum();
    let mut bytes = Vec::with_capacity(8 + 8 + 8 + payload_len + 8 + parents.len() * HASH_SIZE);
    bytes.extend_from_slice(&index.to_le_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    for tx in payload {
        bytes.extend_from_slice(&(tx.len() as u64).to_le_bytes());
        bytes.extend_from_slice(tx);
    }
    bytes.extend_from_slice(&(parents.len() as u64).to_le_bytes());
    for parent in parents {
        bytes.extend_from_slice(parent.as_bytes());
    }
    bytes
}

/// SHA-256 over [`canonical_bytes`].
pub fn compute_hash(
    index: u64,
    timestamp: u64,
    payload: &[Vec<u8>],
    parents: &BTreeSet<BlockHash>,
) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(index, timestamp, payload, parents));
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    BlockHash(out)
}
