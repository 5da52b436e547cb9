use dagcore_consensus::{
    consensus::test_consensus::TestConsensus,
    model::{
        services::reachability::ReachabilityService,
        stores::reachability::{DbReachabilityStore, ReachabilityStoreReader},
    },
};
use dagcore_hashes::Hash;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::collections::VecDeque;

/// A block of a generated DAG, listed in insertion order
#[derive(Clone, Debug)]
pub struct DagBlock {
    pub hash: Hash,
    pub parents: Vec<Hash>,
}

/// Generates a random DAG of `num_blocks` blocks over the genesis of `consensus`, inserting each
/// block as it goes. Parents are drawn from the most recent `window` blocks, so the DAG stays narrow
/// the way a live network DAG does, and no parent is an ancestor of another
#[allow(dead_code)]
pub fn generate_random_dag(consensus: &TestConsensus, seed: u64, num_blocks: u64, max_parents: usize, window: usize) -> Vec<DagBlock> {
    let service = consensus.reachability_service();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut hashes = vec![consensus.genesis_hash()];
    let mut blocks = Vec::with_capacity(num_blocks as usize);
    for i in 1..=num_blocks {
        let mut candidates = hashes[hashes.len().saturating_sub(window)..].to_vec();
        candidates.shuffle(&mut rng);
        let num_parents = rng.gen_range(1..=max_parents.min(candidates.len()));

        let mut parents: Vec<Hash> = Vec::with_capacity(num_parents);
        for candidate in candidates {
            if parents.len() == num_parents {
                break;
            }
            let related = parents.iter().any(|&parent| {
                service.is_dag_ancestor_of(parent, candidate).unwrap() || service.is_dag_ancestor_of(candidate, parent).unwrap()
            });
            if !related {
                parents.push(candidate);
            }
        }

        let hash = Hash::from(i);
        consensus.add_block_with_parents(hash, parents.clone()).unwrap();
        hashes.push(hash);
        blocks.push(DagBlock { hash, parents });
    }
    blocks
}

#[allow(dead_code)]
pub fn insert_dag(consensus: &TestConsensus, blocks: &[DagBlock]) {
    for block in blocks {
        consensus.add_block_with_parents(block.hash, block.parents.clone()).unwrap();
    }
}

/// Walks the reachability tree from `root` and asserts that every child interval is non-empty,
/// strictly contained in its parent interval, and disjoint from and ordered after its older sibling
#[allow(dead_code)]
pub fn assert_valid_intervals(store: &DbReachabilityStore, root: Hash) {
    let mut queue = VecDeque::from([root]);
    let mut visited = 0;
    while let Some(parent) = queue.pop_front() {
        visited += 1;
        let parent_interval = store.get_interval(parent).unwrap();
        let children = store.get_children(parent).unwrap();
        let mut prev_end = parent_interval.start.checked_sub(1);
        for child in children.iter().copied() {
            let child_interval = store.get_interval(child).unwrap();
            assert!(!child_interval.is_empty(), "block {child} has an empty interval");
            assert!(parent_interval.strictly_contains(child_interval), "{child_interval} of {child} escapes {parent_interval}");
            if let Some(prev_end) = prev_end {
                assert!(child_interval.start > prev_end, "{child_interval} of {child} overlaps its older sibling");
            }
            prev_end = Some(child_interval.end);
            assert_eq!(store.get_parent(child).unwrap(), parent);
            queue.push_back(child);
        }
    }
    assert_eq!(visited, store.count().unwrap());
}
