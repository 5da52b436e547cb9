use crate::processes::ghostdag::ordering::SortableBlock;

use dagcore_consensus_core::{
    BlockHashMap, BlockHasher, BlueWorkType, HashKTypeMap, HashMapCustomHasher, KType, blockhash::BlockHashes,
};
use dagcore_database::prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, DbKey, StoreError, StoreResult};
use dagcore_database::registry::DatabaseStorePrefixes;
use dagcore_hashes::Hash;
use itertools::Itertools;
use rocksdb::WriteBatch;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, sync::Arc};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
    pub mergeset_blues: BlockHashes,
    pub mergeset_reds: BlockHashes,
    pub blues_anticone_sizes: HashKTypeMap,
}

#[derive(Clone, Serialize, Deserialize, Copy, Debug, PartialEq, Eq)]
pub struct CompactGhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
}

impl GhostdagData {
    pub fn new(
        blue_score: u64,
        blue_work: BlueWorkType,
        selected_parent: Hash,
        mergeset_blues: BlockHashes,
        mergeset_reds: BlockHashes,
        blues_anticone_sizes: HashKTypeMap,
    ) -> Self {
        Self { blue_score, blue_work, selected_parent, mergeset_blues, mergeset_reds, blues_anticone_sizes }
    }

    pub fn new_with_selected_parent(selected_parent: Hash, k: KType) -> Self {
        let mut mergeset_blues: Vec<Hash> = Vec::with_capacity(k as usize + 1);
        let mut blues_anticone_sizes: BlockHashMap<KType> = BlockHashMap::with_capacity(k as usize);
        mergeset_blues.push(selected_parent);
        blues_anticone_sizes.insert(selected_parent, 0);

        Self {
            blue_score: Default::default(),
            blue_work: Default::default(),
            selected_parent,
            mergeset_blues: BlockHashes::new(mergeset_blues),
            mergeset_reds: Default::default(),
            blues_anticone_sizes: HashKTypeMap::new(blues_anticone_sizes),
        }
    }

    pub fn mergeset_size(&self) -> usize {
        self.mergeset_blues.len() + self.mergeset_reds.len()
    }

    /// Returns the mergeset (excluding the selected parent) in ascending blue work order, tie-breaking by hash
    pub fn ascending_mergeset_without_selected_parent(
        &self,
        store: &(impl GhostdagStoreReader + ?Sized),
    ) -> StoreResult<impl Iterator<Item = SortableBlock>> {
        let blues = self.sortable(self.mergeset_blues.iter().skip(1), store)?;
        let reds = self.sortable(self.mergeset_reds.iter(), store)?;
        // Blues and reds are each stored in ascending order, so a merge suffices
        Ok(blues.into_iter().merge_join_by(reds, |a, b| a.cmp(b)).map(|r| r.reduce(|b, _| b)))
    }

    /// Returns the mergeset (excluding the selected parent) in descending blue work order, tie-breaking by hash
    pub fn descending_mergeset_without_selected_parent(
        &self,
        store: &(impl GhostdagStoreReader + ?Sized),
    ) -> StoreResult<impl Iterator<Item = SortableBlock>> {
        let blues = self.sortable(self.mergeset_blues.iter().skip(1).rev(), store)?;
        let reds = self.sortable(self.mergeset_reds.iter().rev(), store)?;
        Ok(blues.into_iter().merge_join_by(reds, |a, b| b.cmp(a)).map(|r| r.reduce(|b, _| b)))
    }

    fn sortable<'a>(
        &self,
        hashes: impl Iterator<Item = &'a Hash>,
        store: &(impl GhostdagStoreReader + ?Sized),
    ) -> StoreResult<Vec<SortableBlock>> {
        hashes.map(|&h| Ok(SortableBlock::new(h, store.get_blue_work(h)?))).collect()
    }

    /// Returns an iterator to the mergeset with no specified order (excluding the selected parent)
    pub fn unordered_mergeset_without_selected_parent(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues
            .iter()
            .skip(1) // Skip the selected parent
            .cloned()
            .chain(self.mergeset_reds.iter().cloned())
    }

    /// Returns an iterator to the mergeset with no specified order (including the selected parent)
    pub fn unordered_mergeset(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().cloned().chain(self.mergeset_reds.iter().cloned())
    }

    pub fn to_compact(&self) -> CompactGhostdagData {
        CompactGhostdagData { blue_score: self.blue_score, blue_work: self.blue_work, selected_parent: self.selected_parent }
    }
}

impl GhostdagData {
    pub fn add_blue(self: &mut Arc<Self>, block: Hash, blue_anticone_size: KType, block_blues_anticone_sizes: &BlockHashMap<KType>) {
        // Extract mutable data
        let data = Arc::make_mut(self);

        // Add the new blue block to mergeset blues
        BlockHashes::make_mut(&mut data.mergeset_blues).push(block);

        // Get a mut ref to internal anticone size map
        let blues_anticone_sizes = HashKTypeMap::make_mut(&mut data.blues_anticone_sizes);

        // Insert the new blue block with its blue anticone size to the map
        blues_anticone_sizes.insert(block, blue_anticone_size);

        // Insert/update map entries for blocks affected by this insertion
        for (blue, size) in block_blues_anticone_sizes {
            blues_anticone_sizes.insert(*blue, size + 1);
        }
    }

    pub fn add_red(self: &mut Arc<Self>, block: Hash) {
        let data = Arc::make_mut(self);
        BlockHashes::make_mut(&mut data.mergeset_reds).push(block);
    }

    pub fn finalize_score_and_work(self: &mut Arc<Self>, blue_score: u64, blue_work: BlueWorkType) {
        let data = Arc::make_mut(self);
        data.blue_score = blue_score;
        data.blue_work = blue_work;
    }
}

pub trait GhostdagStoreReader {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError>;
    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError>;
    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError>;
    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError>;

    /// Returns full block data for the requested hash
    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError>;

    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError>;

    /// Check if the store contains data for the requested hash
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

pub trait GhostdagStore: GhostdagStoreReader {
    /// Insert GHOSTDAG data for block `hash` into the store. Note that GHOSTDAG data
    /// is added once and never modified, so no need for specific setters for each element.
    /// Additionally, this means writes are semantically "append-only", which is why
    /// we can keep the `insert` method non-mutable on self.
    fn insert(&self, hash: Hash, data: Arc<GhostdagData>) -> Result<(), StoreError>;
}

/// A DB + cache implementation of `GhostdagStoreReader`, with concurrency support.
/// Writes go through [`StagingGhostdagStore`]
#[derive(Clone)]
pub struct DbGhostdagStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<GhostdagData>, BlockHasher>,
    compact_access: CachedDbAccess<Hash, CompactGhostdagData, BlockHasher>,
}

impl DbGhostdagStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy, compact_cache_policy: CachePolicy) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(db.clone(), cache_policy, DatabaseStorePrefixes::Ghostdag.into()),
            compact_access: CachedDbAccess::new(db, compact_cache_policy, DatabaseStorePrefixes::GhostdagCompact.into()),
        }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy, compact_cache_policy: CachePolicy) -> Self {
        Self::new(Arc::clone(&self.db), cache_policy, compact_cache_policy)
    }

    pub fn insert_batch(&self, batch: &mut WriteBatch, hash: Hash, data: &Arc<GhostdagData>) -> Result<(), StoreError> {
        if self.access.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }
        self.access.write_without_cache(BatchDbWriter::new(batch), hash, data)?;
        self.compact_access.write_without_cache(BatchDbWriter::new(batch), hash, &data.to_compact())?;
        Ok(())
    }

    fn update_cache(&self, hash: Hash, data: Arc<GhostdagData>) {
        self.compact_access.update_cache(hash, data.to_compact());
        self.access.update_cache(hash, data);
    }
}

impl GhostdagStoreReader for DbGhostdagStore {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError> {
        Ok(self.compact_access.read(hash)?.blue_score)
    }

    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError> {
        Ok(self.compact_access.read(hash)?.blue_work)
    }

    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        Ok(self.compact_access.read(hash)?.selected_parent)
    }

    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(Arc::clone(&self.access.read(hash)?.mergeset_blues))
    }

    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(Arc::clone(&self.access.read(hash)?.mergeset_reds))
    }

    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError> {
        Ok(Arc::clone(&self.access.read(hash)?.blues_anticone_sizes))
    }

    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError> {
        self.access.read(hash)
    }

    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError> {
        self.compact_access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }
}

/// Staging overlay of [`DbGhostdagStore`]. Since ghostdag data is append-only, no lock is
/// held on the underlying store and inserts are only checked for duplicates
pub struct StagingGhostdagStore<'a> {
    store: &'a DbGhostdagStore,
    staging_writes: BlockHashMap<Arc<GhostdagData>>,
}

impl<'a> StagingGhostdagStore<'a> {
    pub fn new(store: &'a DbGhostdagStore) -> Self {
        Self { store, staging_writes: BlockHashMap::new() }
    }

    pub fn insert(&mut self, hash: Hash, data: Arc<GhostdagData>) -> Result<(), StoreError> {
        if self.staging_writes.contains_key(&hash) || self.store.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }
        self.staging_writes.insert(hash, data);
        Ok(())
    }

    pub fn is_staged(&self) -> bool {
        !self.staging_writes.is_empty()
    }

    pub(crate) fn serialize(&self, batch: &mut WriteBatch) -> Result<(), StoreError> {
        for (hash, data) in self.staging_writes.iter() {
            self.store.insert_batch(batch, *hash, data)?;
        }
        Ok(())
    }

    pub(crate) fn update_cache(self) {
        for (hash, data) in self.staging_writes {
            self.store.update_cache(hash, data);
        }
    }
}

impl GhostdagStoreReader for StagingGhostdagStore<'_> {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(data.blue_score),
            None => self.store.get_blue_score(hash),
        }
    }

    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(data.blue_work),
            None => self.store.get_blue_work(hash),
        }
    }

    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(data.selected_parent),
            None => self.store.get_selected_parent(hash),
        }
    }

    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(BlockHashes::clone(&data.mergeset_blues)),
            None => self.store.get_mergeset_blues(hash),
        }
    }

    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(BlockHashes::clone(&data.mergeset_reds)),
            None => self.store.get_mergeset_reds(hash),
        }
    }

    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(HashKTypeMap::clone(&data.blues_anticone_sizes)),
            None => self.store.get_blues_anticone_sizes(hash),
        }
    }

    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(Arc::clone(data)),
            None => self.store.get_data(hash),
        }
    }

    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(data) => Ok(data.to_compact()),
            None => self.store.get_compact_data(hash),
        }
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.staging_writes.contains_key(&hash) || self.store.has(hash)?)
    }
}

/// An in-memory implementation of `GhostdagStore` trait to be used for tests.
/// Uses `RefCell` for interior mutability in order to workaround `insert`
/// being non-mutable.
#[derive(Default)]
pub struct MemoryGhostdagStore {
    map: RefCell<BlockHashMap<Arc<GhostdagData>>>,
}

impl MemoryGhostdagStore {
    pub fn new() -> Self {
        Self { map: RefCell::new(BlockHashMap::new()) }
    }

    fn not_found(hash: Hash) -> StoreError {
        StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::Ghostdag.as_ref(), hash))
    }
}

impl GhostdagStore for MemoryGhostdagStore {
    fn insert(&self, hash: Hash, data: Arc<GhostdagData>) -> Result<(), StoreError> {
        if self.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }
        self.map.borrow_mut().insert(hash, data);
        Ok(())
    }
}

impl GhostdagStoreReader for MemoryGhostdagStore {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError> {
        Ok(self.get_data(hash)?.blue_score)
    }

    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError> {
        Ok(self.get_data(hash)?.blue_work)
    }

    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        Ok(self.get_data(hash)?.selected_parent)
    }

    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(BlockHashes::clone(&self.get_data(hash)?.mergeset_blues))
    }

    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(BlockHashes::clone(&self.get_data(hash)?.mergeset_reds))
    }

    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError> {
        Ok(HashKTypeMap::clone(&self.get_data(hash)?.blues_anticone_sizes))
    }

    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError> {
        self.map.borrow().get(&hash).cloned().ok_or_else(|| Self::not_found(hash))
    }

    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError> {
        Ok(self.get_data(hash)?.to_compact())
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.map.borrow().contains_key(&hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagcore_consensus_core::BlockHashSet;
    use dagcore_database::{
        create_temp_db,
        prelude::{ConnBuilder, StoreErrorPredicates},
    };

    fn factory(w: u64) -> Arc<GhostdagData> {
        Arc::new(GhostdagData {
            blue_score: Default::default(),
            blue_work: w.into(),
            selected_parent: Default::default(),
            mergeset_blues: Default::default(),
            mergeset_reds: Default::default(),
            blues_anticone_sizes: Default::default(),
        })
    }

    #[test]
    fn test_mergeset_iterators() {
        let store = MemoryGhostdagStore::new();

        // Blues
        store.insert(1.into(), factory(2)).unwrap();
        store.insert(2.into(), factory(7)).unwrap();
        store.insert(3.into(), factory(11)).unwrap();

        // Reds
        store.insert(4.into(), factory(4)).unwrap();
        store.insert(5.into(), factory(9)).unwrap();
        store.insert(6.into(), factory(11)).unwrap(); // Tie-breaking case

        let mut data = Arc::new(GhostdagData::new_with_selected_parent(1.into(), 5));
        data.add_blue(2.into(), Default::default(), &Default::default());
        data.add_blue(3.into(), Default::default(), &Default::default());

        data.add_red(4.into());
        data.add_red(5.into());
        data.add_red(6.into());

        let mut expected: Vec<Hash> = vec![4.into(), 2.into(), 5.into(), 3.into(), 6.into()];
        assert_eq!(expected, data.ascending_mergeset_without_selected_parent(&store).unwrap().map(|b| b.hash).collect::<Vec<Hash>>());

        expected.reverse();
        assert_eq!(expected, data.descending_mergeset_without_selected_parent(&store).unwrap().map(|b| b.hash).collect::<Vec<Hash>>());

        // Use sets since the below functions have no order guarantee
        let expected = BlockHashSet::from_iter([4.into(), 2.into(), 5.into(), 3.into(), 6.into()]);
        assert_eq!(expected, data.unordered_mergeset_without_selected_parent().collect::<BlockHashSet>());

        let expected = BlockHashSet::from_iter([1.into(), 4.into(), 2.into(), 5.into(), 3.into(), 6.into()]);
        assert_eq!(expected, data.unordered_mergeset().collect::<BlockHashSet>());
        assert_eq!(6, data.mergeset_size());
    }

    #[test]
    fn test_mergeset_iterator_missing_data() {
        let store = MemoryGhostdagStore::new();
        store.insert(1.into(), factory(2)).unwrap();
        let mut data = Arc::new(GhostdagData::new_with_selected_parent(1.into(), 5));
        data.add_red(7.into());
        assert!(data.ascending_mergeset_without_selected_parent(&store).is_err_and(|e| e.is_key_not_found()));
    }

    #[test]
    fn test_staging_overlay() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbGhostdagStore::new(db.clone(), CachePolicy::Count(16), CachePolicy::Count(16));

        let mut staging = StagingGhostdagStore::new(&store);
        staging.insert(1.into(), factory(5)).unwrap();
        assert!(staging.insert(1.into(), factory(5)).unwrap_err().is_already_exists());
        assert_eq!(staging.get_blue_work(1.into()).unwrap(), BlueWorkType::from(5u64));
        assert!(!store.has(1.into()).unwrap());

        let mut batch = WriteBatch::default();
        staging.serialize(&mut batch).unwrap();
        db.write(batch).unwrap();
        staging.update_cache();

        assert_eq!(store.get_compact_data(1.into()).unwrap().blue_work, BlueWorkType::from(5u64));
        assert_eq!(*store.get_data(1.into()).unwrap(), *factory(5));

        // A fresh cache must read the same data back from the DB
        let reloaded = store.clone_with_new_cache(CachePolicy::Count(4), CachePolicy::Empty);
        assert_eq!(reloaded.get_blue_work(1.into()).unwrap(), BlueWorkType::from(5u64));
        assert!(StagingGhostdagStore::new(&reloaded).insert(1.into(), factory(1)).unwrap_err().is_already_exists());
    }
}
