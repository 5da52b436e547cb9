use crate::model::stores::relations::RelationsStore;
use dagcore_consensus_core::blockhash::BlockHashes;
use dagcore_database::prelude::{StoreError, StoreResult};
use dagcore_hashes::Hash;

/// Higher level relations operations keeping the parents and children mappings consistent
pub trait RelationsStoreExtensions: RelationsStore {
    /// Inserts `parents` into a new store entry for `hash`, and for each `parent ∈ parents` adds `hash` to `parent.children`
    fn insert(&mut self, hash: Hash, parents: BlockHashes) -> StoreResult<()> {
        if self.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }

        // Read every parent up front, so an unknown parent fails before anything is written
        let mut parent_children: Vec<(Hash, Vec<Hash>)> = Vec::with_capacity(parents.len());
        for parent in parents.iter().copied() {
            if parent_children.iter().any(|(known, _)| *known == parent) {
                continue;
            }
            parent_children.push((parent, (*self.get_children(parent)?).clone()));
        }

        // Insert a new entry for `hash`
        self.set_parents(hash, BlockHashes::clone(&parents))?;

        // The new hash has no children yet
        self.set_children(hash, BlockHashes::new(Vec::new()))?;

        // Update `children` for each parent
        for (parent, mut children) in parent_children {
            children.push(hash);
            self.set_children(parent, BlockHashes::new(children))?;
        }

        Ok(())
    }

    /// Replaces the parents of an existing `hash`, detaching it from the children lists of
    /// former parents and attaching it to the new ones
    fn replace_parents(&mut self, hash: Hash, parents: BlockHashes) -> StoreResult<()> {
        let current = self.get_parents(hash)?;

        for parent in current.iter().copied().filter(|p| !parents.contains(p)) {
            let children: Vec<Hash> = self.get_children(parent)?.iter().copied().filter(|&c| c != hash).collect();
            self.set_children(parent, BlockHashes::new(children))?;
        }

        for parent in parents.iter().copied().filter(|p| !current.contains(p)) {
            let mut children = (*self.get_children(parent)?).clone();
            children.push(hash);
            self.set_children(parent, BlockHashes::new(children))?;
        }

        self.set_parents(hash, parents)
    }
}

impl<S: RelationsStore + ?Sized> RelationsStoreExtensions for S {}
