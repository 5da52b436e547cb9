//!
//! Tree-related functions internal to the module
//!
use super::{
    extensions::ReachabilityStoreIntervalExtensions,
    inquirer::{get_next_chain_ancestor_unchecked, is_chain_ancestor_of},
    reindex::ReindexOperationContext,
    *,
};
use crate::model::stores::{ghostdag::GhostdagStoreReader, reachability::ReachabilityStore};
use dagcore_core::{debug, trace};
use dagcore_hashes::Hash;

/// Adds `new_block` as a reachability tree child of `parent`, allocating half of the remaining
/// capacity of `parent` or triggering a reindex if no capacity remains
pub fn add_tree_block(store: &mut (impl ReachabilityStore + ?Sized), new_block: Hash, parent: Hash, reindex_slack: u64) -> Result<()> {
    // Get the remaining interval capacity
    let remaining = store.interval_remaining_after(parent)?;
    // Append the new child to `parent.children`
    store.append_child(parent, new_block)?;
    if remaining.is_empty() {
        // Init with the empty interval.
        // Note: internal logic relies on interval being this specific interval
        //       which comes exactly at the end of current capacity
        store.insert(new_block, parent, remaining)?;

        // Start a reindex operation
        let reindex_root = store.get_reindex_root()?;
        debug!("Reachability reindex triggered by block {} (reindex root {})", new_block, reindex_root);
        let mut ctx = ReindexOperationContext::new(store, reindex_slack);
        ctx.reindex_intervals(new_block, reindex_root)?;
    } else {
        let allocated = remaining.split_half().0;
        store.insert(new_block, parent, allocated)?;
    };
    Ok(())
}

/// Finds the most recent tree ancestor common to both `block` and the given `reindex root`.
/// Note that we assume that almost always the chain between the reindex root and the common
/// ancestor is longer than the chain between block and the common ancestor, hence we iterate
/// from `block`.
pub fn find_common_tree_ancestor(store: &(impl ReachabilityStore + ?Sized), block: Hash, reindex_root: Hash) -> Result<Hash> {
    let mut current = block;
    loop {
        if is_chain_ancestor_of(store, current, reindex_root)? {
            return Ok(current);
        }
        current = store.get_parent(current)?;
    }
}

/// Finds a possible new reindex root, based on the `current` reindex root and the selected tip `hint`.
/// Returns the common ancestor of `current` and `hint` along with the new root
pub fn find_next_reindex_root(
    store: &(impl ReachabilityStore + ?Sized),
    ghostdag_store: &(impl GhostdagStoreReader + ?Sized),
    current: Hash,
    hint: Hash,
    reindex_window: u64,
    reindex_slack: u64,
) -> Result<(Hash, Hash)> {
    let mut ancestor = current;
    let mut next = current;

    let hint_blue_score = ghostdag_store.get_blue_score(hint)?;

    // Test if current root is ancestor of selected tip (`hint`), if not, this is a reorg case
    if !is_chain_ancestor_of(store, current, hint)? {
        let current_blue_score = ghostdag_store.get_blue_score(current)?;

        // We have reindex root out of (hint) selected tip chain, however we switch chains only after a sufficient
        // threshold of `reindex_slack` diff in order to address possible alternating reorg attacks.
        // The `reindex_slack` constant is used as an heuristic large enough on the one hand, but
        // one which will not harm performance on the other hand, given the available slack at the chain split point.
        //
        // Note: In some cases the blue score of the (hint) selected tip can be lower than the current reindex root blue score.
        // If that's the case we keep the reindex root unchanged.
        if hint_blue_score < current_blue_score || hint_blue_score - current_blue_score < reindex_slack {
            return Ok((current, current));
        }

        let common = find_common_tree_ancestor(store, hint, current)?;
        ancestor = common;
        next = common;
    }

    // Iterate from ancestor towards the selected tip (`hint`) until passing the
    // `reindex_window` threshold, for finding the new reindex root
    loop {
        if next == hint {
            break;
        }

        let child = get_next_chain_ancestor_unchecked(store, hint, next)?;
        let child_blue_score = ghostdag_store.get_blue_score(child)?;

        if hint_blue_score < child_blue_score {
            return Err(ReachabilityError::DataInconsistency);
        }
        if hint_blue_score - child_blue_score < reindex_window {
            break;
        }
        next = child;
    }

    Ok((ancestor, next))
}

/// Attempts to advance or move the current reindex root according to the
/// provided `virtual selected parent` (`VSP`) hint.
/// It is important for the reindex root point to follow the consensus-agreed chain
/// since this way it can benefit from chain-robustness which is implied by the security
/// of the ordering protocol. That is, it enjoys from the fact that all future blocks are
/// expected to elect the root subtree (by converging to the agreement to have it on the
/// selected chain).
pub fn try_advancing_reindex_root(
    store: &mut (impl ReachabilityStore + ?Sized),
    ghostdag_store: &(impl GhostdagStoreReader + ?Sized),
    hint: Hash,
    reindex_window: u64,
    reindex_slack: u64,
) -> Result<()> {
    // Get current root from the store
    let current = store.get_reindex_root()?;

    // Find the possible new root
    let (mut ancestor, next) = find_next_reindex_root(store, ghostdag_store, current, hint, reindex_window, reindex_slack)?;

    // No update to root, return
    if current == next {
        return Ok(());
    }

    if ancestor == next {
        trace!("next reindex root {} is an ancestor of current one {}, skipping concentration", next, current);
    }
    while ancestor != next {
        let child = get_next_chain_ancestor_unchecked(store, next, ancestor)?;
        let mut ctx = ReindexOperationContext::new(store, reindex_slack);
        ctx.concentrate_interval(ancestor, child, child == next)?;
        ancestor = child;
    }

    trace!("moving reindex root from {} to {}", current, next);

    // Update reindex root in the data store
    store.set_reindex_root(next)?;
    Ok(())
}
