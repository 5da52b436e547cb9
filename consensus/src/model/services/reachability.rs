use crate::{
    model::stores::reachability::ReachabilityStoreReader,
    processes::reachability::{Result, inquirer},
};
use dagcore_hashes::Hash;
use parking_lot::RwLock;
use std::sync::Arc;

/// Read-only reachability queries for callers which do not hold a staging area
pub trait ReachabilityService {
    fn is_chain_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool>;
    fn is_dag_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool>;
    fn is_dag_ancestor_of_any(&self, this: Hash, queried: &mut impl Iterator<Item = Hash>) -> Result<bool>;
    fn is_any_dag_ancestor(&self, list: &mut impl Iterator<Item = Hash>, queried: Hash) -> Result<bool>;
    fn get_next_chain_ancestor(&self, descendant: Hash, ancestor: Hash) -> Result<Hash>;
    fn get_chain_parent(&self, this: Hash) -> Result<Hash>;
}

/// Multi-threaded reachability service imp
#[derive(Clone)]
pub struct MTReachabilityService<T: ReachabilityStoreReader> {
    store: Arc<RwLock<T>>,
}

impl<T: ReachabilityStoreReader> MTReachabilityService<T> {
    pub fn new(store: Arc<RwLock<T>>) -> Self {
        Self { store }
    }

    /// Returns a forward iterator walking up the chain-selection tree from `from_ancestor`
    /// to `to_descendant`, where `to_descendant` is included if `inclusive` is set to true.
    ///
    /// The caller is expected to verify that `from_ancestor` is indeed a chain ancestor of
    /// `to_descendant`, otherwise the iterator yields a [`ReachabilityError::BadQuery`](crate::processes::reachability::ReachabilityError::BadQuery).
    ///
    /// Note: this function should not be used for heavy multi-step iterations, since every step
    /// acquires the store read lock anew
    pub fn forward_chain_iterator(&self, from_ancestor: Hash, to_descendant: Hash, inclusive: bool) -> ForwardChainIterator<T> {
        ForwardChainIterator::new(self.store.clone(), from_ancestor, to_descendant, inclusive)
    }
}

impl<T: ReachabilityStoreReader> ReachabilityService for MTReachabilityService<T> {
    fn is_chain_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        inquirer::is_chain_ancestor_of(&*read_guard, this, queried)
    }

    fn is_dag_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        inquirer::is_dag_ancestor_of(&*read_guard, this, queried)
    }

    fn is_dag_ancestor_of_any(&self, this: Hash, queried: &mut impl Iterator<Item = Hash>) -> Result<bool> {
        let read_guard = self.store.read();
        for hash in queried {
            if inquirer::is_dag_ancestor_of(&*read_guard, this, hash)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_any_dag_ancestor(&self, list: &mut impl Iterator<Item = Hash>, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        for hash in list {
            if inquirer::is_dag_ancestor_of(&*read_guard, hash, queried)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_next_chain_ancestor(&self, descendant: Hash, ancestor: Hash) -> Result<Hash> {
        let read_guard = self.store.read();
        inquirer::get_next_chain_ancestor(&*read_guard, descendant, ancestor)
    }

    fn get_chain_parent(&self, this: Hash) -> Result<Hash> {
        Ok(self.store.read().get_parent(this)?)
    }
}

/// Iterates the chain of tree children leading from an ancestor to one of its descendants.
/// A failed step is yielded once, after which the iterator is exhausted
pub struct ForwardChainIterator<T: ReachabilityStoreReader> {
    store: Arc<RwLock<T>>,
    current: Option<Hash>,
    descendant: Hash,
    inclusive: bool,
}

impl<T: ReachabilityStoreReader> ForwardChainIterator<T> {
    fn new(store: Arc<RwLock<T>>, from_ancestor: Hash, to_descendant: Hash, inclusive: bool) -> Self {
        Self { store, current: Some(from_ancestor), descendant: to_descendant, inclusive }
    }
}

impl<T: ReachabilityStoreReader> Iterator for ForwardChainIterator<T> {
    type Item = Result<Hash>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        if current == self.descendant {
            return if self.inclusive { Some(Ok(current)) } else { None };
        }

        let next = inquirer::get_next_chain_ancestor(&*self.store.read(), self.descendant, current);
        match next {
            Ok(next) => {
                self.current = Some(next);
                Some(Ok(current))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::stores::reachability::MemoryReachabilityStore,
        processes::reachability::ReachabilityError,
    };
    use dagcore_consensus_core::config::constants::perf::DEFAULT_REINDEX_SLACK;

    /// Builds the tree 1 -> 2 -> 3 -> 4 with a side branch 2 -> 5, where 4 also points at 5
    fn build_service() -> MTReachabilityService<MemoryReachabilityStore> {
        let mut store = MemoryReachabilityStore::new();
        inquirer::init(&mut store, 1.into()).unwrap();
        for (block, selected_parent, mergeset) in [(2u64, 1u64, vec![]), (3, 2, vec![]), (5, 2, vec![]), (4, 3, vec![5u64])] {
            let mut mergeset = mergeset.into_iter().map(Hash::from);
            inquirer::add_block(&mut store, block.into(), selected_parent.into(), &mut mergeset, DEFAULT_REINDEX_SLACK).unwrap();
        }
        MTReachabilityService::new(Arc::new(RwLock::new(store)))
    }

    #[test]
    fn test_ancestry_queries() {
        let service = build_service();
        assert!(service.is_chain_ancestor_of(2.into(), 4.into()).unwrap());
        assert!(!service.is_chain_ancestor_of(5.into(), 4.into()).unwrap());
        assert!(service.is_dag_ancestor_of(5.into(), 4.into()).unwrap());
        assert!(!service.is_dag_ancestor_of(3.into(), 5.into()).unwrap());
        assert!(service.is_dag_ancestor_of_any(5.into(), &mut [Hash::from(3), Hash::from(4)].into_iter()).unwrap());
        assert!(!service.is_dag_ancestor_of_any(3.into(), &mut [Hash::from(5)].into_iter()).unwrap());
        assert!(service.is_any_dag_ancestor(&mut [Hash::from(3), Hash::from(5)].into_iter(), 4.into()).unwrap());
        assert!(!service.is_any_dag_ancestor(&mut [Hash::from(3), Hash::from(4)].into_iter(), 5.into()).unwrap());
        assert_eq!(service.get_next_chain_ancestor(4.into(), 1.into()).unwrap(), 2.into());
        assert_eq!(service.get_chain_parent(5.into()).unwrap(), 2.into());
        assert!(service.is_dag_ancestor_of(9.into(), 4.into()).unwrap_err().is_key_not_found());
    }

    #[test]
    fn test_forward_chain_iterator() {
        let service = build_service();
        let chain = service.forward_chain_iterator(1.into(), 4.into(), true).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(chain, vec![Hash::from(1), Hash::from(2), Hash::from(3), Hash::from(4)]);

        let chain = service.forward_chain_iterator(2.into(), 4.into(), false).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(chain, vec![Hash::from(2), Hash::from(3)]);

        let chain = service.forward_chain_iterator(4.into(), 4.into(), false).collect::<Result<Vec<_>>>().unwrap();
        assert!(chain.is_empty());

        // 5 is not a chain ancestor of 4
        let mut iter = service.forward_chain_iterator(5.into(), 4.into(), true);
        assert!(matches!(iter.next(), Some(Err(ReachabilityError::BadQuery))));
        assert!(iter.next().is_none());
    }
}
