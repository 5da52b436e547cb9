use crate::processes::reachability::interval::Interval;
use dagcore_consensus_core::{
    BlockHashMap, BlockHashSet, BlockHasher, HashMapCustomHasher,
    blockhash::{self, BlockHashes},
};
use dagcore_database::{
    prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, CachedDbItem, DB, DbKey, StoreError, StoreResult},
    registry::DatabaseStorePrefixes,
};
use dagcore_hashes::Hash;

use parking_lot::{RwLockUpgradableReadGuard, RwLockWriteGuard};
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::{collections::hash_map::Entry::Vacant, ops::Range, sync::Arc};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ReachabilityData {
    pub children: BlockHashes,
    pub parent: Hash,
    pub interval: Interval,
    pub future_covering_set: BlockHashes,
}

impl ReachabilityData {
    pub fn new(parent: Hash, interval: Interval) -> Self {
        Self { children: Arc::new(vec![]), parent, interval, future_covering_set: Arc::new(vec![]) }
    }
}

/// Reader API for `ReachabilityStore`.
pub trait ReachabilityStoreReader {
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
    fn get_interval(&self, hash: Hash) -> Result<Interval, StoreError>;
    /// Returns the reachability *tree* parent of `hash`
    fn get_parent(&self, hash: Hash) -> Result<Hash, StoreError>;
    /// Returns the reachability *tree* children of `hash`
    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_future_covering_set(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    /// Returns the counts of entries in the store. To be used for tests only
    fn count(&self) -> Result<usize, StoreError>;
}

/// Write API for `ReachabilityStore`. All write functions are deliberately `mut`
/// since reachability writes are not append-only and thus need to be guarded.
pub trait ReachabilityStore: ReachabilityStoreReader {
    fn init(&mut self, origin: Hash, capacity: Interval) -> Result<(), StoreError>;
    fn insert(&mut self, hash: Hash, parent: Hash, interval: Interval) -> Result<(), StoreError>;
    fn set_interval(&mut self, hash: Hash, interval: Interval) -> Result<(), StoreError>;
    fn append_child(&mut self, hash: Hash, child: Hash) -> Result<(), StoreError>;
    fn insert_future_covering_item(&mut self, hash: Hash, fci: Hash, insertion_index: usize) -> Result<(), StoreError>;
    /// Replaces the future covering set entries at `range` with `replace_with`
    fn replace_future_covering_items(&mut self, hash: Hash, range: Range<usize>, replace_with: &[Hash]) -> Result<(), StoreError>;
    fn set_reindex_root(&mut self, root: Hash) -> Result<(), StoreError>;
    fn get_reindex_root(&self) -> Result<Hash, StoreError>;
}

fn not_found(hash: Hash) -> StoreError {
    StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::Reachability.as_ref(), hash))
}

fn reindex_root_not_found() -> StoreError {
    StoreError::KeyNotFound(DbKey::prefix_only(DatabaseStorePrefixes::ReachabilityReindexRoot.as_ref()))
}

/// A DB + cache implementation of `ReachabilityStoreReader`, with concurrent readers support.
/// Mutations are staged through [`StagingReachabilityStore`]
#[derive(Clone)]
pub struct DbReachabilityStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<ReachabilityData>, BlockHasher>,
    reindex_root: CachedDbItem<Hash>,
}

impl DbReachabilityStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(Arc::clone(&db), cache_policy, DatabaseStorePrefixes::Reachability.into()),
            reindex_root: CachedDbItem::new(db, DatabaseStorePrefixes::ReachabilityReindexRoot.into()),
        }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy) -> Self {
        Self::new(Arc::clone(&self.db), cache_policy)
    }

    pub fn get_reindex_root(&self) -> Result<Hash, StoreError> {
        self.reindex_root.read()
    }

    /// Collects all block hashes persisted by this store
    fn keys(&self) -> StoreResult<BlockHashSet> {
        self.access
            .iterator()
            .map(|r| {
                let (key, _) = r.map_err(|e| StoreError::DataInconsistency(e.to_string()))?;
                Hash::try_from_slice(&key).map_err(|e| StoreError::DataInconsistency(e.to_string()))
            })
            .collect()
    }
}

impl ReachabilityStoreReader for DbReachabilityStore {
    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }

    fn get_interval(&self, hash: Hash) -> Result<Interval, StoreError> {
        Ok(self.access.read(hash)?.interval)
    }

    fn get_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        Ok(self.access.read(hash)?.parent)
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(Arc::clone(&self.access.read(hash)?.children))
    }

    fn get_future_covering_set(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(Arc::clone(&self.access.read(hash)?.future_covering_set))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.keys()?.len())
    }
}

/// Staging overlay of [`DbReachabilityStore`]. Holds an upgradable read lock for its whole
/// lifetime so that no other staging area can mutate reachability concurrently
pub struct StagingReachabilityStore<'a> {
    store_read: RwLockUpgradableReadGuard<'a, DbReachabilityStore>,
    staging_writes: BlockHashMap<ReachabilityData>,
    staging_reindex_root: Option<Hash>,
}

impl<'a> StagingReachabilityStore<'a> {
    pub fn new(store_read: RwLockUpgradableReadGuard<'a, DbReachabilityStore>) -> Self {
        Self { store_read, staging_writes: BlockHashMap::new(), staging_reindex_root: None }
    }

    pub fn is_staged(&self) -> bool {
        !self.staging_writes.is_empty() || self.staging_reindex_root.is_some()
    }

    pub(crate) fn serialize(&self, batch: &mut WriteBatch) -> Result<(), StoreError> {
        for (hash, data) in self.staging_writes.iter() {
            self.store_read.access.write_without_cache(BatchDbWriter::new(batch), *hash, &Arc::new(data.clone()))?;
        }
        if let Some(root) = self.staging_reindex_root {
            self.store_read.reindex_root.write_without_cache(BatchDbWriter::new(batch), &root)?;
        }
        Ok(())
    }

    /// Upgrades the read lock into a write lock, blocking readers until the returned guard is dropped
    pub(crate) fn upgrade(self) -> ReachabilityStoreWriteGuard<'a> {
        ReachabilityStoreWriteGuard {
            store_write: RwLockUpgradableReadGuard::upgrade(self.store_read),
            staging_writes: self.staging_writes,
            staging_reindex_root: self.staging_reindex_root,
        }
    }

    fn staged_data_mut(&mut self, hash: Hash) -> Result<&mut ReachabilityData, StoreError> {
        if let Vacant(e) = self.staging_writes.entry(hash) {
            e.insert((*self.store_read.access.read(hash)?).clone());
        }
        self.staging_writes.get_mut(&hash).ok_or_else(|| not_found(hash))
    }
}

/// Write-locked reachability store whose staged changes were persisted. Consuming it refreshes the caches
pub(crate) struct ReachabilityStoreWriteGuard<'a> {
    store_write: RwLockWriteGuard<'a, DbReachabilityStore>,
    staging_writes: BlockHashMap<ReachabilityData>,
    staging_reindex_root: Option<Hash>,
}

impl ReachabilityStoreWriteGuard<'_> {
    pub(crate) fn update_cache(mut self) {
        for (hash, data) in self.staging_writes {
            self.store_write.access.update_cache(hash, Arc::new(data));
        }
        if let Some(root) = self.staging_reindex_root {
            self.store_write.reindex_root.update_cache(root);
        }
    }
}

impl ReachabilityStore for StagingReachabilityStore<'_> {
    fn init(&mut self, origin: Hash, capacity: Interval) -> Result<(), StoreError> {
        self.insert(origin, blockhash::NONE, capacity)?;
        self.set_reindex_root(origin)?;
        Ok(())
    }

    fn insert(&mut self, hash: Hash, parent: Hash, interval: Interval) -> Result<(), StoreError> {
        if self.store_read.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }
        if let Vacant(e) = self.staging_writes.entry(hash) {
            e.insert(ReachabilityData::new(parent, interval));
            Ok(())
        } else {
            Err(StoreError::HashAlreadyExists(hash))
        }
    }

    fn set_interval(&mut self, hash: Hash, interval: Interval) -> Result<(), StoreError> {
        self.staged_data_mut(hash)?.interval = interval;
        Ok(())
    }

    fn append_child(&mut self, hash: Hash, child: Hash) -> Result<(), StoreError> {
        let data = self.staged_data_mut(hash)?;
        Arc::make_mut(&mut data.children).push(child);
        Ok(())
    }

    fn insert_future_covering_item(&mut self, hash: Hash, fci: Hash, insertion_index: usize) -> Result<(), StoreError> {
        let data = self.staged_data_mut(hash)?;
        Arc::make_mut(&mut data.future_covering_set).insert(insertion_index, fci);
        Ok(())
    }

    fn replace_future_covering_items(&mut self, hash: Hash, range: Range<usize>, replace_with: &[Hash]) -> Result<(), StoreError> {
        let data = self.staged_data_mut(hash)?;
        Arc::make_mut(&mut data.future_covering_set).splice(range, replace_with.iter().copied());
        Ok(())
    }

    fn set_reindex_root(&mut self, root: Hash) -> Result<(), StoreError> {
        self.staging_reindex_root = Some(root);
        Ok(())
    }

    fn get_reindex_root(&self) -> Result<Hash, StoreError> {
        match self.staging_reindex_root {
            Some(root) => Ok(root),
            None => self.store_read.get_reindex_root(),
        }
    }
}

impl ReachabilityStoreReader for StagingReachabilityStore<'_> {
    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.staging_writes.contains_key(&hash) || self.store_read.access.has(hash)?)
    }

    fn get_interval(&self, hash: Hash) -> Result<Interval, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(data.interval),
            None => self.store_read.get_interval(hash),
        }
    }

    fn get_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(data.parent),
            None => self.store_read.get_parent(hash),
        }
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(BlockHashes::clone(&data.children)),
            None => self.store_read.get_children(hash),
        }
    }

    fn get_future_covering_set(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(BlockHashes::clone(&data.future_covering_set)),
            None => self.store_read.get_future_covering_set(hash),
        }
    }

    fn count(&self) -> Result<usize, StoreError> {
        let mut keys = self.store_read.keys()?;
        keys.extend(self.staging_writes.keys().copied());
        Ok(keys.len())
    }
}

#[derive(Default)]
pub struct MemoryReachabilityStore {
    map: BlockHashMap<ReachabilityData>,
    reindex_root: Option<Hash>,
}

impl MemoryReachabilityStore {
    pub fn new() -> Self {
        Self { map: BlockHashMap::new(), reindex_root: None }
    }

    fn get_data_mut(&mut self, hash: Hash) -> Result<&mut ReachabilityData, StoreError> {
        self.map.get_mut(&hash).ok_or_else(|| not_found(hash))
    }

    fn get_data(&self, hash: Hash) -> Result<&ReachabilityData, StoreError> {
        self.map.get(&hash).ok_or_else(|| not_found(hash))
    }
}

impl ReachabilityStore for MemoryReachabilityStore {
    fn init(&mut self, origin: Hash, capacity: Interval) -> Result<(), StoreError> {
        self.insert(origin, blockhash::NONE, capacity)?;
        self.set_reindex_root(origin)?;
        Ok(())
    }

    fn insert(&mut self, hash: Hash, parent: Hash, interval: Interval) -> Result<(), StoreError> {
        if let Vacant(e) = self.map.entry(hash) {
            e.insert(ReachabilityData::new(parent, interval));
            Ok(())
        } else {
            Err(StoreError::HashAlreadyExists(hash))
        }
    }

    fn set_interval(&mut self, hash: Hash, interval: Interval) -> Result<(), StoreError> {
        let data = self.get_data_mut(hash)?;
        data.interval = interval;
        Ok(())
    }

    fn append_child(&mut self, hash: Hash, child: Hash) -> Result<(), StoreError> {
        let data = self.get_data_mut(hash)?;
        Arc::make_mut(&mut data.children).push(child);
        Ok(())
    }

    fn insert_future_covering_item(&mut self, hash: Hash, fci: Hash, insertion_index: usize) -> Result<(), StoreError> {
        let data = self.get_data_mut(hash)?;
        Arc::make_mut(&mut data.future_covering_set).insert(insertion_index, fci);
        Ok(())
    }

    fn replace_future_covering_items(&mut self, hash: Hash, range: Range<usize>, replace_with: &[Hash]) -> Result<(), StoreError> {
        let data = self.get_data_mut(hash)?;
        Arc::make_mut(&mut data.future_covering_set).splice(range, replace_with.iter().copied());
        Ok(())
    }

    fn set_reindex_root(&mut self, root: Hash) -> Result<(), StoreError> {
        self.reindex_root = Some(root);
        Ok(())
    }

    fn get_reindex_root(&self) -> Result<Hash, StoreError> {
        self.reindex_root.ok_or_else(reindex_root_not_found)
    }
}

impl ReachabilityStoreReader for MemoryReachabilityStore {
    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.map.contains_key(&hash))
    }

    fn get_interval(&self, hash: Hash) -> Result<Interval, StoreError> {
        Ok(self.get_data(hash)?.interval)
    }

    fn get_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        Ok(self.get_data(hash)?.parent)
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(Arc::clone(&self.get_data(hash)?.children))
    }

    fn get_future_covering_set(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(Arc::clone(&self.get_data(hash)?.future_covering_set))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.map.len())
    }
}
