use crate::block::Block;
use crate::clock::{Clock, SystemClock};
use crate::config::DagConfig;
use crate::constants::GENESIS_INDEX;
use crate::error::{InsertError, RestoreError};
use crate::hash::BlockHash;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Hash-keyed block arena with a child index and the current tip set.
///
/// Not synchronized; share it through [`crate::Ledger`].
#[derive(Clone, Debug)]
pub struct DagStore {
    /// All blocks indexed by hash
    pub(crate) blocks: HashMap<BlockHash, Arc<Block>>,
    /// Insertion order
    order: Vec<BlockHash>,
    /// Reverse edges
    children: HashMap<BlockHash, Vec<BlockHash>>,
    /// Blocks with no children
    tips: BTreeSet<BlockHash>,
    genesis: BlockHash,
    /// Latest timestamp sealed or restored; new blocks seal strictly after it
    last_timestamp: u64,
    clock: Arc<dyn Clock>,
}

impl Default for DagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DagStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(&DagConfig::default(), clock)
    }

    /// Create a store holding only the genesis block.
    pub fn with_config(config: &DagConfig, clock: Arc<dyn Clock>) -> Self {
        let timestamp = config.genesis_timestamp.unwrap_or_else(|| clock.now());
        let genesis = Block::seal(
            GENESIS_INDEX,
            timestamp,
            config.genesis_payload_bytes(),
            BTreeSet::new(),
        );
        let id = genesis.hash();
        debug!(hash = %id, timestamp, "genesis block sealed");

        Self {
            blocks: HashMap::from([(id, Arc::new(genesis))]),
            order: vec![id],
            children: HashMap::new(),
            tips: BTreeSet::from([id]),
            genesis: id,
            last_timestamp: timestamp,
            clock,
        }
    }

    /// Rebuild a store from blocks sealed earlier, in the order they were
    /// first inserted. Hashes and parent links are taken on trust here; run the
    /// validator afterwards.
    pub fn from_blocks<I>(blocks: I, clock: Arc<dyn Clock>) -> Result<Self, RestoreError>
    where
        I: IntoIterator<Item = Block>,
    {
        let mut iter = blocks.into_iter();
        let first = iter.next().ok_or(RestoreError::Empty)?;
        if !first.is_genesis() {
            return Err(RestoreError::MissingGenesis(first.hash()));
        }

        let genesis = first.hash();
        let last_timestamp = first.timestamp();
        let mut store = Self {
            blocks: HashMap::from([(genesis, Arc::new(first))]),
            order: vec![genesis],
            children: HashMap::new(),
            tips: BTreeSet::from([genesis]),
            genesis,
            last_timestamp,
            clock,
        };

        for block in iter {
            let id = block.hash();
            if store.blocks.contains_key(&id) {
                return Err(RestoreError::DuplicateBlock(id));
            }
            store.last_timestamp = store.last_timestamp.max(block.timestamp());
            store.register(block);
        }

        debug!(blocks = store.len(), tips = store.tips.len(), "store restored");
        Ok(store)
    }

    /// Seal a new block on top of `parents` and register it.
    pub fn insert<P>(&mut self, payload: Vec<Vec<u8>>, parents: P) -> Result<BlockHash, InsertError>
    where
        P: IntoIterator<Item = BlockHash>,
    {
        let parents: BTreeSet<BlockHash> = parents.into_iter().collect();
        if parents.is_empty() {
            return Err(InsertError::EmptyParentSet);
        }

        let mut max_parent_index = GENESIS_INDEX;
        for parent_id in &parents {
            let parent = self
                .blocks
                .get(parent_id)
                .ok_or(InsertError::UnknownParent(*parent_id))?;
            max_parent_index = max_parent_index.max(parent.index());
        }

        // Timestamps are unique within a store, so identical payloads on the
        // same parents still seal to distinct blocks.
        let timestamp = self
            .clock
            .now()
            .max(self.last_timestamp.saturating_add(1));
        let block = Block::seal(max_parent_index.saturating_add(1), timestamp, payload, parents);
        let id = block.hash();
        self.last_timestamp = timestamp;

        debug!(
            hash = %id,
            index = block.index(),
            parents = block.parents().len(),
            txs = block.payload().len(),
            "block inserted"
        );
        self.register(block);
        Ok(id)
    }

    /// Insert a block whose parents are every current tip, merging the frontier.
    pub fn append(&mut self, payload: Vec<Vec<u8>>) -> Result<BlockHash, InsertError> {
        let parents = self.tips.clone();
        self.insert(payload, parents)
    }

    fn register(&mut self, block: Block) {
        let id = block.hash();
        for parent_id in block.parents() {
            self.children.entry(*parent_id).or_default().push(id);
            self.tips.remove(parent_id);
        }
        // Restored blocks may arrive after their children.
        if !self.children.contains_key(&id) {
            self.tips.insert(id);
        }
        self.order.push(id);
        self.blocks.insert(id, Arc::new(block));
    }

    pub fn get(&self, hash: &BlockHash) -> Option<Arc<Block>> {
        self.blocks.get(hash).cloned()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn tips(&self) -> &BTreeSet<BlockHash> {
        &self.tips
    }

    pub fn genesis(&self) -> BlockHash {
        self.genesis
    }

    /// Timestamp of the most recent block; the next insert seals after it.
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Block>> + '_ {
        self.order.iter().filter_map(|id| self.blocks.get(id))
    }

    pub fn children(&self, hash: &BlockHash) -> &[BlockHash] {
        self.children.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive parents of `hash`, not including `hash` itself.
    pub fn ancestors(&self, hash: &BlockHash) -> HashSet<BlockHash> {
        let mut result = HashSet::new();
        let mut stack = vec![*hash];
        while let Some(id) = stack.pop() {
            if let Some(block) = self.blocks.get(&id) {
                for parent in block.parents() {
                    if result.insert(*parent) {
                        stack.push(*parent);
                    }
                }
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub(crate) fn insertion_order(&self) -> &[BlockHash] {
        &self.order
    }
}
