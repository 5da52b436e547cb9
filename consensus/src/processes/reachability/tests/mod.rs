//!
//! Test utils for reachability
//!
use super::{inquirer::*, tree::*};
use crate::{
    model::stores::{
        ghostdag::{GhostdagData, GhostdagStore, GhostdagStoreReader, MemoryGhostdagStore},
        reachability::{ReachabilityStore, ReachabilityStoreReader},
        relations::{MemoryRelationsStore, RelationsStoreReader},
    },
    processes::{reachability::interval::Interval, relations::RelationsStoreExtensions},
};
use dagcore_consensus_core::{
    BlockHashSet, HashMapCustomHasher,
    blockhash::{self, BlockHashExtensions, BlockHashes},
    config::constants::perf::{DEFAULT_REINDEX_SLACK, DEFAULT_REINDEX_WINDOW},
};
use dagcore_database::prelude::StoreError;
use dagcore_hashes::Hash;
use std::{collections::VecDeque, sync::Arc};
use thiserror::Error;

/// Registers `hash` in the ghostdag store with a blue score equal to its depth in the tree
fn insert_depth_as_blue_score(ghostdag_store: &MemoryGhostdagStore, hash: Hash, parent: Hash) {
    let blue_score = if parent.is_none() { 0 } else { ghostdag_store.get_blue_score(parent).unwrap() + 1 };
    let mut data = GhostdagData::new_with_selected_parent(parent, 18);
    data.blue_score = blue_score;
    ghostdag_store.insert(hash, Arc::new(data)).unwrap();
}

/// A struct with fluent API to streamline reachability store building
pub struct StoreBuilder<'a, T: ReachabilityStore + ?Sized> {
    store: &'a mut T,
}

impl<'a, T: ReachabilityStore + ?Sized> StoreBuilder<'a, T> {
    pub fn new(store: &'a mut T) -> Self {
        Self { store }
    }

    pub fn add_block(&mut self, hash: Hash, parent: Hash) -> &mut Self {
        if !parent.is_none() {
            self.store.append_child(parent, hash).unwrap();
        }
        self.store.insert(hash, parent, Interval::empty()).unwrap();
        self
    }
}

/// A struct with fluent API to streamline tree building
pub struct TreeBuilder<'a, T: ReachabilityStore + ?Sized> {
    store: &'a mut T,
    ghostdag_store: &'a MemoryGhostdagStore,
    reindex_window: u64,
    reindex_slack: u64,
}

impl<'a, T: ReachabilityStore + ?Sized> TreeBuilder<'a, T> {
    pub fn new(store: &'a mut T, ghostdag_store: &'a MemoryGhostdagStore) -> Self {
        Self { store, ghostdag_store, reindex_window: DEFAULT_REINDEX_WINDOW, reindex_slack: DEFAULT_REINDEX_SLACK }
    }

    pub fn new_with_params(store: &'a mut T, ghostdag_store: &'a MemoryGhostdagStore, reindex_window: u64, reindex_slack: u64) -> Self {
        Self { store, ghostdag_store, reindex_window, reindex_slack }
    }

    pub fn init_with_params(&mut self, origin: Hash, capacity: Interval) -> &mut Self {
        init_with_params(self.store, origin, capacity).unwrap();
        insert_depth_as_blue_score(self.ghostdag_store, origin, blockhash::NONE);
        self
    }

    pub fn add_block(&mut self, hash: Hash, parent: Hash) -> &mut Self {
        insert_depth_as_blue_score(self.ghostdag_store, hash, parent);
        add_tree_block(self.store, hash, parent, self.reindex_slack).unwrap();
        try_advancing_reindex_root(self.store, self.ghostdag_store, hash, self.reindex_window, self.reindex_slack).unwrap();
        self
    }
}

#[derive(Clone)]
pub struct DagBlock {
    pub hash: Hash,
    pub parents: Vec<Hash>,
}

impl DagBlock {
    pub fn new(hash: Hash, parents: Vec<Hash>) -> Self {
        Self { hash, parents }
    }
}

/// A struct with fluent API to streamline DAG building
pub struct DagBuilder<'a, T: ReachabilityStore + ?Sized> {
    store: &'a mut T,
    ghostdag_store: &'a MemoryGhostdagStore,
    relations: MemoryRelationsStore,
}

impl<'a, T: ReachabilityStore + ?Sized> DagBuilder<'a, T> {
    pub fn new(store: &'a mut T, ghostdag_store: &'a MemoryGhostdagStore) -> Self {
        Self { store, ghostdag_store, relations: MemoryRelationsStore::new() }
    }

    pub fn init(&mut self, origin: Hash) -> &mut Self {
        init(self.store, origin).unwrap();
        insert_depth_as_blue_score(self.ghostdag_store, origin, blockhash::NONE);
        self.relations.insert(origin, BlockHashes::new(vec![])).unwrap();
        self
    }

    pub fn add_block(&mut self, block: DagBlock) -> &mut Self {
        // Select by blue score (which is the depth here) just for the sake of internal isolated tests
        let selected_parent =
            block.parents.iter().copied().max_by_key(|p| self.ghostdag_store.get_blue_score(*p).unwrap()).unwrap();
        let mergeset = self.mergeset(&block, selected_parent);
        insert_depth_as_blue_score(self.ghostdag_store, block.hash, selected_parent);
        add_block(self.store, block.hash, selected_parent, &mut mergeset.iter().copied(), DEFAULT_REINDEX_SLACK).unwrap();
        hint_virtual_selected_parent(self.store, self.ghostdag_store, block.hash, DEFAULT_REINDEX_WINDOW, DEFAULT_REINDEX_SLACK)
            .unwrap();
        self.relations.insert(block.hash, BlockHashes::new(block.parents)).unwrap();
        self
    }

    fn mergeset(&self, block: &DagBlock, selected_parent: Hash) -> Vec<Hash> {
        let mut queue: VecDeque<Hash> = block.parents.iter().copied().filter(|p| *p != selected_parent).collect();
        let mut mergeset: BlockHashSet = queue.iter().copied().collect();
        let mut past = BlockHashSet::new();

        while let Some(current) = queue.pop_front() {
            for parent in self.relations.get_parents(current).unwrap().iter() {
                if mergeset.contains(parent) || past.contains(parent) {
                    continue;
                }

                if is_dag_ancestor_of(&*self.store, *parent, selected_parent).unwrap() {
                    past.insert(*parent);
                    continue;
                }

                mergeset.insert(*parent);
                queue.push_back(*parent);
            }
        }
        mergeset.into_iter().collect()
    }
}

#[derive(Error, Debug)]
pub enum TestError {
    #[error("data store error")]
    StoreError(#[from] StoreError),

    #[error("empty interval")]
    EmptyInterval(Hash, Interval),

    #[error("sibling intervals are expected to be consecutive")]
    NonConsecutiveSiblingIntervals(Interval, Interval),

    #[error("future covering set intervals are expected to be ordered")]
    NonOrderedFutureCoveringItems(Interval, Interval),

    #[error("child interval out of parent bounds")]
    IntervalOutOfParentBounds { parent: Hash, child: Hash, parent_interval: Interval, child_interval: Interval },
}

pub trait StoreValidationExtensions {
    /// Checks if `block` is in the past of `other` (creates hashes from the u64 numbers)
    fn in_past_of(&self, block: u64, other: u64) -> bool;

    /// Checks if `block` and `other` are in the anticone of each other
    /// (creates hashes from the u64 numbers)
    fn are_anticone(&self, block: u64, other: u64) -> bool;

    /// Validates that all tree intervals match the expected interval relations
    fn validate_intervals(&self, root: Hash) -> std::result::Result<(), TestError>;
}

impl<T: ReachabilityStoreReader + ?Sized> StoreValidationExtensions for T {
    fn in_past_of(&self, block: u64, other: u64) -> bool {
        if block == other {
            return false;
        }
        let res = is_dag_ancestor_of(self, block.into(), other.into()).unwrap();
        if res {
            // Assert that the `future` relation is indeed asymmetric
            assert!(!is_dag_ancestor_of(self, other.into(), block.into()).unwrap())
        }
        res
    }

    fn are_anticone(&self, block: u64, other: u64) -> bool {
        !is_dag_ancestor_of(self, block.into(), other.into()).unwrap() && !is_dag_ancestor_of(self, other.into(), block.into()).unwrap()
    }

    fn validate_intervals(&self, root: Hash) -> std::result::Result<(), TestError> {
        let mut queue = VecDeque::<Hash>::from([root]);
        while let Some(parent) = queue.pop_front() {
            let children = self.get_children(parent)?;
            queue.extend(children.iter());

            let parent_interval = self.get_interval(parent)?;
            if parent_interval.is_empty() {
                return Err(TestError::EmptyInterval(parent, parent_interval));
            }

            // Verify parent-child strict relation
            for child in children.iter().copied() {
                let child_interval = self.get_interval(child)?;
                if !parent_interval.strictly_contains(child_interval) {
                    return Err(TestError::IntervalOutOfParentBounds { parent, child, parent_interval, child_interval });
                }
            }

            // Iterate over consecutive siblings
            for siblings in children.windows(2) {
                let sibling_interval = self.get_interval(siblings[0])?;
                let current_interval = self.get_interval(siblings[1])?;
                if sibling_interval.end + 1 != current_interval.start {
                    return Err(TestError::NonConsecutiveSiblingIntervals(sibling_interval, current_interval));
                }
            }

            // Future covering items are disjoint and sorted by interval
            for items in self.get_future_covering_set(parent)?.windows(2) {
                let first = self.get_interval(items[0])?;
                let second = self.get_interval(items[1])?;
                if first.end >= second.start {
                    return Err(TestError::NonOrderedFutureCoveringItems(first, second));
                }
            }
        }
        Ok(())
    }
}
