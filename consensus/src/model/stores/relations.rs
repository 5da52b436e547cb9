use dagcore_consensus_core::{BlockHashMap, BlockHasher, HashMapCustomHasher, blockhash::BlockHashes};
use dagcore_database::prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, DbKey, StoreError};
use dagcore_database::registry::DatabaseStorePrefixes;
use dagcore_hashes::Hash;
use parking_lot::{RwLockUpgradableReadGuard, RwLockWriteGuard};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `RelationsStore`.
pub trait RelationsStoreReader {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;

    /// Returns the counts of entries in parents/children stores. To be used for tests only
    fn counts(&self) -> Result<(usize, usize), StoreError>;
}

/// Low-level write API for `RelationsStore`. Higher level operations which keep parents
/// and children consistent live in `processes::relations::RelationsStoreExtensions`
pub trait RelationsStore: RelationsStoreReader {
    fn set_parents(&mut self, hash: Hash, parents: BlockHashes) -> Result<(), StoreError>;
    fn set_children(&mut self, hash: Hash, children: BlockHashes) -> Result<(), StoreError>;
}

/// A DB + cache implementation of `RelationsStoreReader`, with concurrent readers support.
/// Mutations are staged through [`StagingRelationsStore`]
#[derive(Clone)]
pub struct DbRelationsStore {
    db: Arc<DB>,
    parents_access: CachedDbAccess<Hash, BlockHashes, BlockHasher>,
    children_access: CachedDbAccess<Hash, BlockHashes, BlockHasher>,
}

impl DbRelationsStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy) -> Self {
        Self {
            db: Arc::clone(&db),
            parents_access: CachedDbAccess::new(Arc::clone(&db), cache_policy, DatabaseStorePrefixes::RelationsParents.into()),
            children_access: CachedDbAccess::new(db, cache_policy, DatabaseStorePrefixes::RelationsChildren.into()),
        }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy) -> Self {
        Self::new(Arc::clone(&self.db), cache_policy)
    }
}

impl RelationsStoreReader for DbRelationsStore {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        self.parents_access.read(hash)
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        self.children_access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.parents_access.has(hash)
    }

    fn counts(&self) -> Result<(usize, usize), StoreError> {
        Ok((self.parents_access.iterator().count(), self.children_access.iterator().count()))
    }
}

/// Staging overlay of [`DbRelationsStore`], holding an upgradable read lock until commit
pub struct StagingRelationsStore<'a> {
    store_read: RwLockUpgradableReadGuard<'a, DbRelationsStore>,
    staging_parents_writes: BlockHashMap<BlockHashes>,
    staging_children_writes: BlockHashMap<BlockHashes>,
}

impl<'a> StagingRelationsStore<'a> {
    pub fn new(store_read: RwLockUpgradableReadGuard<'a, DbRelationsStore>) -> Self {
        Self { store_read, staging_parents_writes: BlockHashMap::new(), staging_children_writes: BlockHashMap::new() }
    }

    pub fn is_staged(&self) -> bool {
        !self.staging_parents_writes.is_empty() || !self.staging_children_writes.is_empty()
    }

    pub(crate) fn serialize(&self, batch: &mut WriteBatch) -> Result<(), StoreError> {
        for (hash, parents) in self.staging_parents_writes.iter() {
            self.store_read.parents_access.write_without_cache(BatchDbWriter::new(batch), *hash, parents)?;
        }
        for (hash, children) in self.staging_children_writes.iter() {
            self.store_read.children_access.write_without_cache(BatchDbWriter::new(batch), *hash, children)?;
        }
        Ok(())
    }

    /// Upgrades the read lock into a write lock, blocking readers until the returned guard is dropped
    pub(crate) fn upgrade(self) -> RelationsStoreWriteGuard<'a> {
        RelationsStoreWriteGuard {
            store_write: RwLockUpgradableReadGuard::upgrade(self.store_read),
            staging_parents_writes: self.staging_parents_writes,
            staging_children_writes: self.staging_children_writes,
        }
    }
}

pub(crate) struct RelationsStoreWriteGuard<'a> {
    store_write: RwLockWriteGuard<'a, DbRelationsStore>,
    staging_parents_writes: BlockHashMap<BlockHashes>,
    staging_children_writes: BlockHashMap<BlockHashes>,
}

impl RelationsStoreWriteGuard<'_> {
    pub(crate) fn update_cache(self) {
        for (hash, parents) in self.staging_parents_writes {
            self.store_write.parents_access.update_cache(hash, parents);
        }
        for (hash, children) in self.staging_children_writes {
            self.store_write.children_access.update_cache(hash, children);
        }
    }
}

impl RelationsStoreReader for StagingRelationsStore<'_> {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.staging_parents_writes.get(&hash) {
            Some(parents) => Ok(BlockHashes::clone(parents)),
            None => self.store_read.get_parents(hash),
        }
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.staging_children_writes.get(&hash) {
            Some(children) => Ok(BlockHashes::clone(children)),
            None => self.store_read.get_children(hash),
        }
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.staging_parents_writes.contains_key(&hash) || self.store_read.has(hash)?)
    }

    fn counts(&self) -> Result<(usize, usize), StoreError> {
        let (parents, children) = self.store_read.counts()?;
        let mut new_parents = 0;
        for hash in self.staging_parents_writes.keys() {
            if !self.store_read.parents_access.has(*hash)? {
                new_parents += 1;
            }
        }
        let mut new_children = 0;
        for hash in self.staging_children_writes.keys() {
            if !self.store_read.children_access.has(*hash)? {
                new_children += 1;
            }
        }
        Ok((parents + new_parents, children + new_children))
    }
}

impl RelationsStore for StagingRelationsStore<'_> {
    fn set_parents(&mut self, hash: Hash, parents: BlockHashes) -> Result<(), StoreError> {
        self.staging_parents_writes.insert(hash, parents);
        Ok(())
    }

    fn set_children(&mut self, hash: Hash, children: BlockHashes) -> Result<(), StoreError> {
        self.staging_children_writes.insert(hash, children);
        Ok(())
    }
}

/// An in-memory implementation of `RelationsStore` trait, used by tests and benchmarks
#[derive(Default)]
pub struct MemoryRelationsStore {
    parents_map: BlockHashMap<BlockHashes>,
    children_map: BlockHashMap<BlockHashes>,
}

impl MemoryRelationsStore {
    pub fn new() -> Self {
        Self { parents_map: BlockHashMap::new(), children_map: BlockHashMap::new() }
    }
}

impl RelationsStoreReader for MemoryRelationsStore {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.parents_map.get(&hash) {
            Some(parents) => Ok(BlockHashes::clone(parents)),
            None => Err(StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::RelationsParents.as_ref(), hash))),
        }
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.children_map.get(&hash) {
            Some(children) => Ok(BlockHashes::clone(children)),
            None => Err(StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::RelationsChildren.as_ref(), hash))),
        }
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.parents_map.contains_key(&hash))
    }

    fn counts(&self) -> Result<(usize, usize), StoreError> {
        Ok((self.parents_map.len(), self.children_map.len()))
    }
}

impl RelationsStore for MemoryRelationsStore {
    fn set_parents(&mut self, hash: Hash, parents: BlockHashes) -> Result<(), StoreError> {
        self.parents_map.insert(hash, parents);
        Ok(())
    }

    fn set_children(&mut self, hash: Hash, children: BlockHashes) -> Result<(), StoreError> {
        self.children_map.insert(hash, children);
        Ok(())
    }
}
