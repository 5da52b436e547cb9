use super::{Result, inquirer};
use crate::model::{staging::StagingArea, stores::ghostdag::GhostdagStoreReader};
use crate::model::stores::reachability::ReachabilityStore;
use dagcore_consensus_core::{blockhash::BlockHashExtensions, config::constants::perf::PerfParams};
use dagcore_hashes::Hash;

/// Maintains the reachability tree and future covering sets of all blocks through a [`StagingArea`]
#[derive(Clone)]
pub struct ReachabilityManager {
    reindex_window: u64,
    reindex_slack: u64,
}

impl ReachabilityManager {
    pub fn new(reindex_window: u64, reindex_slack: u64) -> Self {
        Self { reindex_window, reindex_slack }
    }

    pub fn from_perf_params(perf: &PerfParams) -> Self {
        Self::new(perf.reindex_window, perf.reindex_slack)
    }

    /// Adds `block` to the reachability data structures. The GHOSTDAG data of `block` must already
    /// be staged. A block with no selected parent is the origin, which receives the maximal
    /// interval and becomes the reindex root.
    pub fn add_block(&self, staging: &mut StagingArea, block: Hash) -> Result<()> {
        let ghostdag_data = staging.ghostdag().get_data(block)?;
        if ghostdag_data.selected_parent.is_none() {
            return inquirer::init(staging.reachability_mut(), block);
        }

        let mut mergeset = ghostdag_data.unordered_mergeset_without_selected_parent();
        inquirer::add_block(staging.reachability_mut(), block, ghostdag_data.selected_parent, &mut mergeset, self.reindex_slack)
    }

    /// Checks whether `this` is an ancestor of `queried` in the reachability tree. The relation is reflexive
    pub fn is_reachability_tree_ancestor_of(&self, staging: &StagingArea, this: Hash, queried: Hash) -> Result<bool> {
        inquirer::is_chain_ancestor_of(staging.reachability(), this, queried)
    }

    /// Checks whether `queried` is in the future of `this` or equals it
    pub fn is_dag_ancestor_of(&self, staging: &StagingArea, this: Hash, queried: Hash) -> Result<bool> {
        inquirer::is_dag_ancestor_of(staging.reachability(), this, queried)
    }

    /// Returns the tree child of `ancestor` on the chain leading to `descendant`
    pub fn get_next_chain_ancestor(&self, staging: &StagingArea, descendant: Hash, ancestor: Hash) -> Result<Hash> {
        inquirer::get_next_chain_ancestor(staging.reachability(), descendant, ancestor)
    }

    /// Moves the reindex root towards `selected_tip` if the blue score gap allows it
    pub fn update_reindex_root(&self, staging: &mut StagingArea, selected_tip: Hash) -> Result<()> {
        let (reachability, ghostdag) = staging.reachability_and_ghostdag_mut();
        inquirer::hint_virtual_selected_parent(reachability, ghostdag, selected_tip, self.reindex_window, self.reindex_slack)
    }

    pub fn reindex_root(&self, staging: &StagingArea) -> Result<Hash> {
        Ok(staging.reachability().get_reindex_root()?)
    }
}
