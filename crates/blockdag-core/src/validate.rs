//! Whole-DAG integrity checks.
//!
//! The validator trusts nothing the store has cached: hashes are recomputed,
//! the child relation is rebuilt from each block's parent set, and tips are
//! ignored. Every finding is collected so a caller sees all damage at once.

use crate::block::Block;
use crate::config::DagConfig;
use crate::hash::BlockHash;
use crate::store::DagStore;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A single integrity problem found by [`Validator::validate`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("block {0} does not match its recomputed hash")]
    CorruptBlock(BlockHash),
    #[error("block {block} references missing parent {parent}")]
    DanglingParent { block: BlockHash, parent: BlockHash },
    #[error("block {0} is not reachable from genesis")]
    OrphanBlock(BlockHash),
    #[error("parent cycle: {}", format_path(.0))]
    CycleDetected(Vec<BlockHash>),
    #[error("expected exactly one genesis block, found {count}")]
    MalformedGenesis { count: usize },
}

fn format_path(path: &[BlockHash]) -> String {
    path.iter()
        .map(BlockHash::to_hex)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    blocks_checked: usize,
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn blocks_checked(&self) -> usize {
        self.blocks_checked
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Validator {
    parallel: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    pub fn from_config(config: &DagConfig) -> Self {
        Self {
            parallel: config.parallel_validation,
        }
    }

    pub fn validate(&self, store: &DagStore) -> ValidationReport {
        // (registered hash, block), in insertion order
        let entries: Vec<(BlockHash, &Arc<Block>)> = store
            .insertion_order()
            .iter()
            .filter_map(|id| store.blocks.get(id).map(|block| (*id, block)))
            .collect();

        trace!(blocks = entries.len(), parallel = self.parallel, "checking block hashes");
        let mut violations = self.check_hashes(&entries);

        trace!("checking parent links");
        violations.extend(check_parents(store, &entries));

        trace!("checking topology");
        violations.extend(check_topology(store, &entries));

        let genesis_count = entries.iter().filter(|(_, b)| b.is_genesis()).count();
        if genesis_count != 1 {
            violations.push(Violation::MalformedGenesis {
                count: genesis_count,
            });
        }

        let report = ValidationReport {
            blocks_checked: entries.len(),
            violations,
        };
        if report.is_valid() {
            debug!(blocks = report.blocks_checked, "dag is valid");
        } else {
            warn!(
                blocks = report.blocks_checked,
                violations = report.violations.len(),
                "dag failed validation"
            );
        }
        report
    }

    fn check_hashes(&self, entries: &[(BlockHash, &Arc<Block>)]) -> Vec<Violation> {
        let check = |(id, block): &(BlockHash, &Arc<Block>)| {
            let recomputed = block.recompute_hash();
            (recomputed != *id || block.hash() != *id).then_some(Violation::CorruptBlock(*id))
        };
        if self.parallel {
            entries.par_iter().filter_map(check).collect()
        } else {
            entries.iter().filter_map(check).collect()
        }
    }
}

fn check_parents(store: &DagStore, entries: &[(BlockHash, &Arc<Block>)]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (id, block) in entries {
        for parent in block.parents() {
            if !store.blocks.contains_key(parent) {
                violations.push(Violation::DanglingParent {
                    block: *id,
                    parent: *parent,
                });
            }
        }
    }
    violations
}

/// Kahn's algorithm over present parents, then a cycle search over whatever it
/// could not order, then a reachability sweep from the store's genesis.
fn check_topology(store: &DagStore, entries: &[(BlockHash, &Arc<Block>)]) -> Vec<Violation> {
    let mut children: HashMap<BlockHash, Vec<BlockHash>> = HashMap::new();
    let mut in_degree: HashMap<BlockHash, usize> = HashMap::with_capacity(entries.len());
    for (id, block) in entries {
        let mut degree = 0;
        for parent in block.parents() {
            if store.blocks.contains_key(parent) {
                children.entry(*parent).or_default().push(*id);
                degree += 1;
            }
        }
        in_degree.insert(*id, degree);
    }

    let mut queue: VecDeque<BlockHash> = entries
        .iter()
        .filter(|(id, _)| in_degree.get(id) == Some(&0))
        .map(|(id, _)| *id)
        .collect();
    while let Some(id) = queue.pop_front() {
        for child in children.get(&id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }

    let unordered: Vec<BlockHash> = entries
        .iter()
        .filter(|(id, _)| in_degree.get(id).is_some_and(|d| *d > 0))
        .map(|(id, _)| *id)
        .collect();
    let mut violations = find_cycles(store, &unordered);

    // Only the store's own genesis is a root; a second parentless block and
    // everything hanging off it count as orphans.
    let genesis = store.genesis();
    let mut frontier: VecDeque<BlockHash> = VecDeque::new();
    if store.blocks.contains_key(&genesis) {
        frontier.push_back(genesis);
    }
    let mut reached: HashSet<BlockHash> = frontier.iter().copied().collect();
    while let Some(id) = frontier.pop_front() {
        for child in children.get(&id).into_iter().flatten() {
            if reached.insert(*child) {
                frontier.push_back(*child);
            }
        }
    }
    violations.extend(
        entries
            .iter()
            .filter(|(id, _)| !reached.contains(id))
            .map(|(id, _)| Violation::OrphanBlock(*id)),
    );

    violations
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

struct Frame {
    node: BlockHash,
    parents: Vec<BlockHash>,
    next: usize,
}

/// Iterative three-colour DFS along parent edges, restricted to `nodes`.
/// Each back edge found is reported as one cycle.
fn find_cycles(store: &DagStore, nodes: &[BlockHash]) -> Vec<Violation> {
    let members: HashSet<BlockHash> = nodes.iter().copied().collect();
    let parents_within = |id: &BlockHash| -> Vec<BlockHash> {
        store
            .blocks
            .get(id)
            .map(|block| {
                block
                    .parents()
                    .iter()
                    .filter(|p| members.contains(p))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut color: HashMap<BlockHash, Color> = HashMap::with_capacity(nodes.len());
    let mut cycles = Vec::new();

    for start in nodes {
        if color.contains_key(start) {
            continue;
        }
        color.insert(*start, Color::Gray);
        let mut stack = vec![Frame {
            node: *start,
            parents: parents_within(start),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next == frame.parents.len() {
                color.insert(frame.node, Color::Black);
                stack.pop();
                continue;
            }
            let parent = frame.parents[frame.next];
            frame.next += 1;

            match color.get(&parent) {
                None => {
                    color.insert(parent, Color::Gray);
                    stack.push(Frame {
                        node: parent,
                        parents: parents_within(&parent),
                        next: 0,
                    });
                }
                Some(Color::Gray) => {
                    let from = stack.iter().position(|f| f.node == parent).unwrap_or(0);
                    let mut path: Vec<BlockHash> = stack[from..].iter().map(|f| f.node).collect();
                    path.push(parent);
                    cycles.push(Violation::CycleDetected(path));
                }
                Some(Color::Black) => {}
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use std::collections::BTreeSet;

    const T0: u64 = 1_600_000_000_000;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(T0))
    }

    fn tx(s: &str) -> Vec<Vec<u8>> {
        vec![s.as_bytes().to_vec()]
    }

    fn chain(n: usize) -> (DagStore, Vec<BlockHash>) {
        let mut store = DagStore::with_clock(clock());
        let mut hashes = vec![store.genesis()];
        for i in 0..n {
            let prev = *hashes.last().unwrap();
            hashes.push(store.insert(tx(&format!("Transaction {i}")), [prev]).unwrap());
        }
        (store, hashes)
    }

    #[test]
    fn fresh_store_is_valid() {
        let store = DagStore::with_clock(clock());
        let report = Validator::new().validate(&store);
        assert!(report.is_valid());
        assert_eq!(report.blocks_checked(), 1);
    }

    #[test]
    fn chain_is_valid() {
        let (store, hashes) = chain(10);
        let report = Validator::new().validate(&store);
        assert!(report.is_valid(), "{:?}", report.violations());
        assert_eq!(report.blocks_checked(), 11);
        assert_eq!(store.tips(), &BTreeSet::from([*hashes.last().unwrap()]));
    }

    #[test]
    fn diamond_is_valid() {
        let mut store = DagStore::with_clock(clock());
        let g = store.genesis();
        let a = store.insert(tx("a"), [g]).unwrap();
        let b = store.insert(tx("b"), [g]).unwrap();
        store.insert(tx("m"), [a, b]).unwrap();
        assert!(Validator::sequential().validate(&store).is_valid());
    }

    #[test]
    fn overwritten_hash_reports_exactly_one_corrupt_block() {
        let (mut store, hashes) = chain(5);
        let target = hashes[3];
        let original = store.blocks[&target].clone();
        let tampered = Block::from_parts(
            original.index(),
            original.timestamp(),
            original.payload().to_vec(),
            original.parents().clone(),
            BlockHash([0xde; 32]),
        );
        store.blocks.insert(target, Arc::new(tampered));

        let report = Validator::new().validate(&store);
        assert_eq!(report.violations(), &[Violation::CorruptBlock(target)]);
    }

    #[test]
    fn tampered_payload_is_corrupt() {
        let (mut store, hashes) = chain(3);
        let target = hashes[2];
        let original = store.blocks[&target].clone();
        let tampered = Block::from_parts(
            original.index(),
            original.timestamp(),
            tx("Transaction 999"),
            original.parents().clone(),
            original.hash(),
        );
        store.blocks.insert(target, Arc::new(tampered));

        let report = Validator::sequential().validate(&store);
        assert_eq!(report.violations(), &[Violation::CorruptBlock(target)]);
    }

    #[test]
    fn missing_block_reports_dangling_parent_and_orphan() {
        let (mut store, hashes) = chain(3);
        let removed = hashes[2];
        let child = hashes[3];
        store.blocks.remove(&removed);

        let report = Validator::new().validate(&store);
        assert_eq!(
            report.violations(),
            &[
                Violation::DanglingParent {
                    block: child,
                    parent: removed
                },
                Violation::OrphanBlock(child),
            ]
        );
        assert_eq!(report.blocks_checked(), 3);
    }

    #[test]
    fn missing_genesis_is_malformed() {
        let (mut store, hashes) = chain(2);
        store.blocks.remove(&hashes[0]);

        let report = Validator::new().validate(&store);
        let violations = report.violations();
        assert!(violations.contains(&Violation::MalformedGenesis { count: 0 }));
        assert!(violations.contains(&Violation::DanglingParent {
            block: hashes[1],
            parent: hashes[0]
        }));
        assert!(violations.contains(&Violation::OrphanBlock(hashes[1])));
        assert!(violations.contains(&Violation::OrphanBlock(hashes[2])));
    }

    #[test]
    fn second_genesis_is_malformed() {
        let (store, _) = chain(2);
        let mut blocks: Vec<Block> = store.iter().map(|b| Block::clone(b)).collect();
        let other = Block::seal(0, T0, tx("another genesis"), BTreeSet::new());
        let other_id = other.hash();
        blocks.push(other);
        let restored = DagStore::from_blocks(blocks, clock()).unwrap();

        let report = Validator::new().validate(&restored);
        assert_eq!(
            report.violations(),
            &[
                Violation::OrphanBlock(other_id),
                Violation::MalformedGenesis { count: 2 },
            ]
        );
    }

    #[test]
    fn subtree_of_second_genesis_is_orphaned() {
        let (store, hashes) = chain(1);
        let mut blocks: Vec<Block> = store.iter().map(|b| Block::clone(b)).collect();
        let root = Block::seal(0, T0, tx("another genesis"), BTreeSet::new());
        let child = Block::seal(1, T0, tx("under it"), BTreeSet::from([root.hash()]));
        let (root_id, child_id) = (root.hash(), child.hash());
        blocks.extend([root, child]);
        let restored = DagStore::from_blocks(blocks, clock()).unwrap();
        assert_eq!(restored.genesis(), hashes[0]);

        let report = Validator::sequential().validate(&restored);
        assert_eq!(
            report.violations(),
            &[
                Violation::OrphanBlock(root_id),
                Violation::OrphanBlock(child_id),
                Violation::MalformedGenesis { count: 2 },
            ]
        );
    }

    #[test]
    fn forged_two_block_cycle() {
        let store = DagStore::with_clock(clock());
        let g = store.genesis();
        let a_id = BlockHash([0xaa; 32]);
        let b_id = BlockHash([0xbb; 32]);
        let a = Block::from_parts(1, T0, tx("a"), BTreeSet::from([g, b_id]), a_id);
        let b = Block::from_parts(2, T0, tx("b"), BTreeSet::from([a_id]), b_id);
        let genesis = Block::clone(&store.get(&g).unwrap());
        let forged = DagStore::from_blocks(vec![genesis, a, b], clock()).unwrap();

        let report = Validator::new().validate(&forged);
        assert_eq!(
            report.violations(),
            &[
                Violation::CorruptBlock(a_id),
                Violation::CorruptBlock(b_id),
                Violation::CycleDetected(vec![a_id, b_id, a_id]),
            ]
        );
    }

    #[test]
    fn forged_self_parent() {
        let store = DagStore::with_clock(clock());
        let g = store.genesis();
        let x_id = BlockHash([0x11; 32]);
        let x = Block::from_parts(1, T0, tx("x"), BTreeSet::from([x_id]), x_id);
        let genesis = Block::clone(&store.get(&g).unwrap());
        let forged = DagStore::from_blocks(vec![genesis, x], clock()).unwrap();

        let report = Validator::new().validate(&forged);
        assert_eq!(
            report.violations(),
            &[
                Violation::CorruptBlock(x_id),
                Violation::CycleDetected(vec![x_id, x_id]),
                Violation::OrphanBlock(x_id),
            ]
        );
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let (mut store, hashes) = chain(50);
        for target in [hashes[7], hashes[31]] {
            let original = store.blocks[&target].clone();
            let tampered = Block::from_parts(
                original.index() + 1,
                original.timestamp(),
                original.payload().to_vec(),
                original.parents().clone(),
                original.hash(),
            );
            store.blocks.insert(target, Arc::new(tampered));
        }
        let parallel = Validator::new().validate(&store);
        let sequential = Validator::sequential().validate(&store);
        assert_eq!(parallel, sequential);
        assert_eq!(
            parallel.violations(),
            &[
                Violation::CorruptBlock(hashes[7]),
                Violation::CorruptBlock(hashes[31]),
            ]
        );
    }

    #[test]
    fn validator_from_config() {
        let config = DagConfig {
            parallel_validation: false,
            ..DagConfig::default()
        };
        assert!(!Validator::from_config(&config).parallel);
        assert!(Validator::from_config(&DagConfig::default()).parallel);
    }

    #[test]
    fn into_result_example() {
        let (store, _) = chain(1);
        assert!(Validator::new().validate(&store).into_result().is_ok());

        let report = ValidationReport {
            blocks_checked: 1,
            violations: vec![Violation::MalformedGenesis { count: 0 }],
        };
        assert_eq!(
            report.into_result(),
            Err(vec![Violation::MalformedGenesis { count: 0 }])
        );
    }

    #[test]
    fn violation_display() {
        let a = BlockHash([0xaa; 32]);
        let b = BlockHash([0xbb; 32]);
        assert_eq!(
            Violation::CycleDetected(vec![a, b, a]).to_string(),
            format!("parent cycle: {} -> {} -> {}", a, b, a)
        );
        assert_eq!(
            Violation::MalformedGenesis { count: 2 }.to_string(),
            "expected exactly one genesis block, found 2"
        );
        assert_eq!(
            Violation::DanglingParent {
                block: a,
                parent: b
            }
            .to_string(),
            format!("block {a} references missing parent {b}")
        );
    }
}
