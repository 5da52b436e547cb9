use super::{GhostdagResult, missing_ancestor, ordering::SortableBlock, protocol::GhostdagManager};
use crate::{
    model::{
        staging::StagingArea,
        stores::{ghostdag::GhostdagStoreReader, reachability::ReachabilityStoreReader, relations::RelationsStoreReader},
    },
    processes::reachability::inquirer,
};
use dagcore_consensus_core::{BlockHashSet, HashMapCustomHasher};
use dagcore_hashes::Hash;
use std::collections::VecDeque;

/// Collects the blocks in the past of `parents` which are not in the past of `selected_parent`,
/// excluding the selected parent itself
pub fn unordered_mergeset_without_selected_parent(
    relations: &(impl RelationsStoreReader + ?Sized),
    reachability: &(impl ReachabilityStoreReader + ?Sized),
    selected_parent: Hash,
    parents: &[Hash],
) -> GhostdagResult<BlockHashSet> {
    let mut queue = VecDeque::new();
    let mut mergeset = BlockHashSet::new();
    let mut selected_parent_past = BlockHashSet::new();

    for parent in parents.iter().copied().filter(|p| p != &selected_parent) {
        // A parent in the past of the selected parent contributes nothing to the merge-set
        if inquirer::is_dag_ancestor_of(reachability, parent, selected_parent)? {
            selected_parent_past.insert(parent);
            continue;
        }
        if mergeset.insert(parent) {
            queue.push_back(parent);
        }
    }

    while let Some(current) = queue.pop_front() {
        let current_parents = relations.get_parents(current)?;

        // For each parent of the current block we check whether it is in the past of the selected parent. If not,
        // we add it to the resulting merge-set and queue it for further processing.
        for parent in current_parents.iter() {
            if mergeset.contains(parent) {
                continue;
            }

            if selected_parent_past.contains(parent) {
                continue;
            }

            if inquirer::is_dag_ancestor_of(reachability, *parent, selected_parent)? {
                selected_parent_past.insert(*parent);
                continue;
            }

            mergeset.insert(*parent);
            queue.push_back(*parent);
        }
    }

    Ok(mergeset)
}

impl GhostdagManager {
    /// Returns the mergeset of a block with the given parents in consensus-agreed topological order
    /// (ascending blue work, tie-breaking by hash)
    pub fn ordered_mergeset_without_selected_parent(
        &self,
        staging: &StagingArea,
        selected_parent: Hash,
        parents: &[Hash],
    ) -> GhostdagResult<Vec<Hash>> {
        let mergeset = unordered_mergeset_without_selected_parent(staging.relations(), staging.reachability(), selected_parent, parents)?;
        self.sort_blocks(staging, mergeset)
    }

    pub fn sort_blocks(&self, staging: &StagingArea, blocks: impl IntoIterator<Item = Hash>) -> GhostdagResult<Vec<Hash>> {
        let mut sorted_blocks = blocks
            .into_iter()
            .map(|block| Ok(SortableBlock::new(block, staging.ghostdag().get_blue_work(block).map_err(missing_ancestor(block))?)))
            .collect::<GhostdagResult<Vec<_>>>()?;
        sorted_blocks.sort();
        Ok(sorted_blocks.into_iter().map(|block| block.hash).collect())
    }
}
