use crate::block::Block;
use crate::clock::Clock;
use crate::config::DagConfig;
use crate::error::InsertError;
use crate::hash::BlockHash;
use crate::store::DagStore;
use crate::validate::{ValidationReport, Validator};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Thread-safe handle over a [`DagStore`].
///
/// Inserts take the write lock for the whole check-seal-register step, so a
/// reader never sees a block before its parents or a half-updated tip set.
/// Reads share the lock. Validation copies a snapshot and runs unlocked.
#[derive(Clone, Debug)]
pub struct Ledger {
    store: Arc<RwLock<DagStore>>,
    validator: Validator,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::from_store(DagStore::new())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_store(DagStore::with_clock(clock))
    }

    pub fn with_config(config: &DagConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(RwLock::new(DagStore::with_config(config, clock))),
            validator: Validator::from_config(config),
        }
    }

    pub fn from_store(store: DagStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            validator: Validator::new(),
        }
    }

    pub fn insert<P>(&self, payload: Vec<Vec<u8>>, parents: P) -> Result<BlockHash, InsertError>
    where
        P: IntoIterator<Item = BlockHash>,
    {
        // Collect before locking: the iterator may itself read from this ledger.
        let parents: BTreeSet<BlockHash> = parents.into_iter().collect();
        self.store.write().insert(payload, parents)
    }

    /// Insert on top of every current tip, atomically.
    pub fn append(&self, payload: Vec<Vec<u8>>) -> Result<BlockHash, InsertError> {
        self.store.write().append(payload)
    }

    pub fn get(&self, hash: &BlockHash) -> Option<Arc<Block>> {
        self.store.read().get(hash)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.store.read().contains(hash)
    }

    pub fn tips(&self) -> BTreeSet<BlockHash> {
        self.store.read().tips().clone()
    }

    pub fn genesis(&self) -> BlockHash {
        self.store.read().genesis()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Every block, in insertion order, as of this call.
    ///
    /// Eagerly snapshotted: the `Arc`s are collected under the read lock, so
    /// this costs one allocation of `len()` pointers.
    pub fn all(&self) -> AllBlocks {
        let blocks: Vec<Arc<Block>> = self.store.read().iter().cloned().collect();
        AllBlocks {
            inner: blocks.into_iter(),
        }
    }

    /// Point-in-time copy of the store. Blocks are shared, not copied.
    pub fn snapshot(&self) -> DagStore {
        self.store.read().clone()
    }

    pub fn validate(&self) -> ValidationReport {
        let snapshot = self.snapshot();
        self.validator.validate(&snapshot)
    }
}

/// Iterator returned by [`Ledger::all`].
#[derive(Debug)]
pub struct AllBlocks {
    inner: std::vec::IntoIter<Arc<Block>>,
}

impl Iterator for AllBlocks {
    type Item = Arc<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for AllBlocks {}
