use super::{tree::*, *};
use crate::model::stores::{
    ghostdag::GhostdagStoreReader,
    reachability::{ReachabilityStore, ReachabilityStoreReader},
};
use crate::processes::reachability::interval::Interval;
use dagcore_database::prelude::StoreError;
use dagcore_hashes::Hash;

/// Init the reachability store to match the state required by the algorithmic layer.
/// The function first checks the store for possibly being initialized already, and fails with
/// [`ReachabilityError::DataInconsistency`] if it was initialized with a different origin.
pub fn init(store: &mut (impl ReachabilityStore + ?Sized), origin: Hash) -> Result<()> {
    init_with_params(store, origin, Interval::maximal())
}

pub(super) fn init_with_params(store: &mut (impl ReachabilityStore + ?Sized), origin: Hash, capacity: Interval) -> Result<()> {
    if store.has(origin)? {
        return Ok(());
    }
    // An initialized store has a single origin. A reindex root without `origin` means another origin exists
    match store.get_reindex_root() {
        Ok(_) => return Err(ReachabilityError::DataInconsistency),
        Err(StoreError::KeyNotFound(_)) => {}
        Err(err) => return Err(err.into()),
    }
    store.init(origin, capacity)?;
    Ok(())
}

type HashIterator<'a> = &'a mut dyn Iterator<Item = Hash>;

/// Add a block to the DAG reachability data structures and persist using the provided `store`.
/// `selected_parent` becomes the tree parent of `new_block`, and `new_block` is registered in the
/// future covering set of every block yielded by `mergeset_iterator`.
pub fn add_block(
    store: &mut (impl ReachabilityStore + ?Sized),
    new_block: Hash,
    selected_parent: Hash,
    mergeset_iterator: HashIterator,
    reindex_slack: u64,
) -> Result<()> {
    add_tree_block(store, new_block, selected_parent, reindex_slack)?;
    add_dag_block(store, new_block, mergeset_iterator)?;
    Ok(())
}

fn add_dag_block(store: &mut (impl ReachabilityStore + ?Sized), new_block: Hash, mergeset_iterator: HashIterator) -> Result<()> {
    // Update the future covering set for blocks in the mergeset
    for merged_block in mergeset_iterator {
        insert_to_future_covering_set(store, merged_block, new_block)?;
    }
    Ok(())
}

fn insert_to_future_covering_set(store: &mut (impl ReachabilityStore + ?Sized), merged_block: Hash, new_block: Hash) -> Result<()> {
    let future_covering_set = store.get_future_covering_set(merged_block)?;
    match binary_search_descendant(store, future_covering_set.as_slice(), new_block)? {
        // An existing item is a chain ancestor of `new_block`, hence it already covers it
        SearchOutput::Found(_, _) => Ok(()),
        SearchOutput::NotFound(i) => {
            // Items covered by `new_block` have their interval start inside `new_block`'s interval,
            // so they form a consecutive run ending right before the insertion index
            let mut first_covered = i;
            while first_covered > 0 && is_chain_ancestor_of(store, new_block, future_covering_set[first_covered - 1])? {
                first_covered -= 1;
            }
            if first_covered < i {
                store.replace_future_covering_items(merged_block, first_covered..i, &[new_block])?;
            } else {
                store.insert_future_covering_item(merged_block, new_block, i)?;
            }
            Ok(())
        }
    }
}

/// Hint to the reachability algorithm that `hint` is a candidate to become
/// the `virtual selected parent` (`VSP`). This might affect internal reachability heuristics such
/// as moving the reindex point. The consensus runtime is expected to call this function
/// for a new header selected tip which is `header only` / `pending UTXO verification`, or for a completely resolved `VSP`.
pub fn hint_virtual_selected_parent(
    store: &mut (impl ReachabilityStore + ?Sized),
    ghostdag_store: &(impl GhostdagStoreReader + ?Sized),
    hint: Hash,
    reindex_window: u64,
    reindex_slack: u64,
) -> Result<()> {
    try_advancing_reindex_root(store, ghostdag_store, hint, reindex_window, reindex_slack)
}

/// Checks if the `this` block is a strict chain ancestor of the `queried` block (aka `this ∈ chain(queried)`).
/// Note that this results in `false` if `this == queried`
pub fn is_strict_chain_ancestor_of(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    Ok(store.get_interval(this)?.strictly_contains(store.get_interval(queried)?))
}

/// Checks if `this` block is a chain ancestor of `queried` block (aka `this ∈ chain(queried) ∪ {queried}`).
/// Note that we use the graph theory convention here which defines that a block is also an ancestor of itself.
pub fn is_chain_ancestor_of(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    Ok(store.get_interval(this)?.contains(store.get_interval(queried)?))
}

/// Returns true if `this` is a DAG ancestor of `queried` (aka `queried ∈ future(this) ∪ {this}`).
/// Note: this method will return true if `this == queried`.
/// The complexity of this method is O(log(|future_covering_set(this)|))
pub fn is_dag_ancestor_of(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    // First, check if `this` is a chain ancestor of queried
    if is_chain_ancestor_of(store, this, queried)? {
        return Ok(true);
    }
    // Otherwise, use previously registered future blocks to complete the
    // DAG reachability test
    match binary_search_descendant(store, store.get_future_covering_set(this)?.as_slice(), queried)? {
        SearchOutput::Found(_, _) => Ok(true),
        SearchOutput::NotFound(_) => Ok(false),
    }
}

/// Finds the tree child of `ancestor` which is also a chain ancestor of `descendant`.
pub fn get_next_chain_ancestor(store: &(impl ReachabilityStoreReader + ?Sized), descendant: Hash, ancestor: Hash) -> Result<Hash> {
    if descendant == ancestor {
        // The next ancestor does not exist
        return Err(ReachabilityError::BadQuery);
    }
    if !is_strict_chain_ancestor_of(store, ancestor, descendant)? {
        // `ancestor` isn't actually a chain ancestor of `descendant`, so by def
        // we cannot find the next ancestor as well
        return Err(ReachabilityError::BadQuery);
    }

    get_next_chain_ancestor_unchecked(store, descendant, ancestor)
}

/// Note: it is important to keep the unchecked version for internal module use,
/// since in some scenarios during reindexing `descendant` might have a modified
/// interval which was not propagated yet.
pub(super) fn get_next_chain_ancestor_unchecked(
    store: &(impl ReachabilityStoreReader + ?Sized),
    descendant: Hash,
    ancestor: Hash,
) -> Result<Hash> {
    match binary_search_descendant(store, store.get_children(ancestor)?.as_slice(), descendant)? {
        SearchOutput::Found(hash, _) => Ok(hash),
        SearchOutput::NotFound(_) => Err(ReachabilityError::BadQuery),
    }
}

enum SearchOutput {
    NotFound(usize), // `usize` is the position to insert at
    Found(Hash, usize),
}

/// Searches `ordered_hashes` for the single block which is a chain ancestor of `descendant`.
/// The blocks are expected to hold disjoint intervals sorted in ascending order.
fn binary_search_descendant(
    store: &(impl ReachabilityStoreReader + ?Sized),
    ordered_hashes: &[Hash],
    descendant: Hash,
) -> Result<SearchOutput> {
    // `Interval::end` represents the unique number allocated to this block
    let point = store.get_interval(descendant)?.end;

    // Find the number of blocks with an interval starting at or before `point`
    let (mut low, mut high) = (0usize, ordered_hashes.len());
    while low < high {
        let mid = low + (high - low) / 2;
        if store.get_interval(ordered_hashes[mid])?.start <= point {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    // `low` is where `point` was expected (i.e., point < ordered_hashes[low].interval.start),
    // so we expect `ordered_hashes[low - 1].interval` to be the only candidate to contain `point`
    if low > 0 && is_chain_ancestor_of(store, ordered_hashes[low - 1], descendant)? {
        Ok(SearchOutput::Found(ordered_hashes[low - 1], low - 1))
    } else {
        Ok(SearchOutput::NotFound(low))
    }
}

#[cfg(test)]
mod tests {
    use super::{super::tests::*, *};
    use crate::model::stores::{ghostdag::MemoryGhostdagStore, reachability::MemoryReachabilityStore};
    use dagcore_database::prelude::StoreErrorPredicates;

    #[test]
    fn test_add_tree_blocks() {
        // Arrange
        let mut store = MemoryReachabilityStore::new();
        let ghostdag = MemoryGhostdagStore::new();
        // Act
        let root: Hash = 1.into();
        TreeBuilder::new(&mut store, &ghostdag)
            .init_with_params(root, Interval::new(1, 15))
            .add_block(2.into(), root)
            .add_block(3.into(), 2.into())
            .add_block(4.into(), 2.into())
            .add_block(5.into(), 3.into())
            .add_block(6.into(), 5.into())
            .add_block(7.into(), 1.into())
            .add_block(8.into(), 6.into())
            .add_block(9.into(), 6.into())
            .add_block(10.into(), 6.into())
            .add_block(11.into(), 6.into());
        // Assert
        store.validate_intervals(root).unwrap();
    }

    #[test]
    fn test_add_early_blocks() {
        // Arrange
        let mut store = MemoryReachabilityStore::new();
        let ghostdag = MemoryGhostdagStore::new();

        // Act
        let root: Hash = Hash::from_u64_word(1);
        let mut builder = TreeBuilder::new_with_params(&mut store, &ghostdag, 2, 5);
        builder.init_with_params(root, Interval::maximal());
        for i in 2u64..100 {
            builder.add_block(Hash::from_u64_word(i), Hash::from_u64_word(i / 2));
        }

        // Should trigger an earlier than reindex root allocation
        builder.add_block(Hash::from_u64_word(100), Hash::from_u64_word(2));
        store.validate_intervals(root).unwrap();
    }

    #[test]
    fn test_add_dag_blocks() {
        // Arrange
        let mut store = MemoryReachabilityStore::new();
        let ghostdag = MemoryGhostdagStore::new();
        let origin_hash = Hash::from_u64_word(1);

        // Act
        DagBuilder::new(&mut store, &ghostdag)
            .init(origin_hash)
            .add_block(DagBlock::new(2.into(), vec![origin_hash]))
            .add_block(DagBlock::new(3.into(), vec![origin_hash]))
            .add_block(DagBlock::new(4.into(), vec![2.into(), 3.into()]))
            .add_block(DagBlock::new(5.into(), vec![4.into()]))
            .add_block(DagBlock::new(6.into(), vec![origin_hash]))
            .add_block(DagBlock::new(7.into(), vec![5.into(), 6.into()]))
            .add_block(DagBlock::new(8.into(), vec![origin_hash]))
            .add_block(DagBlock::new(9.into(), vec![origin_hash]))
            .add_block(DagBlock::new(10.into(), vec![7.into(), 8.into(), 9.into()]))
            .add_block(DagBlock::new(11.into(), vec![origin_hash]))
            .add_block(DagBlock::new(12.into(), vec![11.into(), 10.into()]));

        // Assert intervals
        store.validate_intervals(origin_hash).unwrap();

        // Assert genesis
        for i in 2u64..=12 {
            assert!(store.in_past_of(1, i));
        }

        // Assert some futures
        assert!(store.in_past_of(2, 4));
        assert!(store.in_past_of(2, 5));
        assert!(store.in_past_of(2, 7));
        assert!(store.in_past_of(5, 10));
        assert!(store.in_past_of(6, 10));
        assert!(store.in_past_of(10, 12));
        assert!(store.in_past_of(11, 12));

        // Assert some anticones
        assert!(store.are_anticone(2, 3));
        assert!(store.are_anticone(2, 6));
        assert!(store.are_anticone(3, 6));
        assert!(store.are_anticone(5, 6));
        assert!(store.are_anticone(3, 8));
        assert!(store.are_anticone(11, 2));
        assert!(store.are_anticone(11, 4));
        assert!(store.are_anticone(11, 6));
        assert!(store.are_anticone(11, 9));
    }

    #[test]
    fn test_future_covering_set_keeps_highest_items() {
        // Arrange
        let mut store = MemoryReachabilityStore::new();
        let ghostdag = MemoryGhostdagStore::new();
        let origin: Hash = 1.into();
        TreeBuilder::new(&mut store, &ghostdag)
            .init_with_params(origin, Interval::maximal())
            .add_block(2.into(), origin)
            .add_block(3.into(), origin)
            .add_block(4.into(), 3.into())
            .add_block(5.into(), 4.into());

        // Act: register a deep block first, then its chain ancestor, then an unrelated block
        insert_to_future_covering_set(&mut store, 2.into(), 5.into()).unwrap();
        assert_eq!(store.get_future_covering_set(2.into()).unwrap().as_slice(), &[5.into()]);
        insert_to_future_covering_set(&mut store, 2.into(), 3.into()).unwrap();
        assert_eq!(store.get_future_covering_set(2.into()).unwrap().as_slice(), &[3.into()]);
        insert_to_future_covering_set(&mut store, 2.into(), 4.into()).unwrap();
        assert_eq!(store.get_future_covering_set(2.into()).unwrap().as_slice(), &[3.into()]);

        // Assert
        for queried in [3u64, 4, 5] {
            assert!(store.in_past_of(2, queried));
        }
        assert!(!store.in_past_of(2, 1));
    }

    #[test]
    fn test_next_chain_ancestor() {
        // Arrange
        let mut store = MemoryReachabilityStore::new();
        let ghostdag = MemoryGhostdagStore::new();
        let root: Hash = 1.into();
        TreeBuilder::new(&mut store, &ghostdag)
            .init_with_params(root, Interval::maximal())
            .add_block(2.into(), root)
            .add_block(3.into(), 2.into())
            .add_block(4.into(), 2.into())
            .add_block(5.into(), 3.into());

        // Act & Assert
        assert_eq!(get_next_chain_ancestor(&store, 5.into(), root).unwrap(), 2.into());
        assert_eq!(get_next_chain_ancestor(&store, 5.into(), 2.into()).unwrap(), 3.into());
        assert_eq!(get_next_chain_ancestor(&store, 4.into(), 2.into()).unwrap(), 4.into());
        assert!(matches!(get_next_chain_ancestor(&store, 5.into(), 5.into()), Err(ReachabilityError::BadQuery)));
        assert!(matches!(get_next_chain_ancestor(&store, 5.into(), 4.into()), Err(ReachabilityError::BadQuery)));
        assert!(matches!(get_next_chain_ancestor(&store, root, 5.into()), Err(ReachabilityError::BadQuery)));

        let err = get_next_chain_ancestor(&store, 5.into(), 42.into()).unwrap_err();
        assert!(err.is_key_not_found());
        assert!(matches!(err, ReachabilityError::StoreError(e) if e.is_key_not_found()));
    }

    #[test]
    fn test_chain_ancestry_is_reflexive() {
        let mut store = MemoryReachabilityStore::new();
        let ghostdag = MemoryGhostdagStore::new();
        let root: Hash = 1.into();
        TreeBuilder::new(&mut store, &ghostdag).init_with_params(root, Interval::maximal()).add_block(2.into(), root);

        for block in [root, 2.into()] {
            assert!(is_chain_ancestor_of(&store, block, block).unwrap());
            assert!(!is_strict_chain_ancestor_of(&store, block, block).unwrap());
            assert!(is_dag_ancestor_of(&store, block, block).unwrap());
        }
        assert!(is_strict_chain_ancestor_of(&store, root, 2.into()).unwrap());
        assert!(!is_chain_ancestor_of(&store, 2.into(), root).unwrap());
    }
}
