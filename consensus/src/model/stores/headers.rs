use dagcore_consensus_core::{BlockHashMap, BlockHasher, HashMapCustomHasher, header::Header};
use dagcore_database::prelude::{BatchDbWriter, CachePolicy, CachedDbAccess, DB, StoreError};
use dagcore_database::registry::DatabaseStorePrefixes;
use dagcore_hashes::Hash;
use rocksdb::WriteBatch;
use std::sync::Arc;

pub trait HeaderStoreReader {
    fn get_bits(&self, hash: Hash) -> Result<u32, StoreError>;
    fn get_header(&self, hash: Hash) -> Result<Arc<Header>, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

/// A DB + cache implementation of `HeaderStoreReader`, with concurrency support.
/// Headers are append-only and are written through [`StagingHeadersStore`]
#[derive(Clone)]
pub struct DbHeadersStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<Header>, BlockHasher>,
}

impl DbHeadersStore {
    pub fn new(db: Arc<DB>, cache_policy: CachePolicy) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, cache_policy, DatabaseStorePrefixes::Headers.into()) }
    }

    pub fn clone_with_new_cache(&self, cache_policy: CachePolicy) -> Self {
        Self::new(Arc::clone(&self.db), cache_policy)
    }

    pub fn insert_batch(&self, batch: &mut WriteBatch, hash: Hash, header: &Arc<Header>) -> Result<(), StoreError> {
        if self.access.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }
        self.access.write_without_cache(BatchDbWriter::new(batch), hash, header)
    }
}

impl HeaderStoreReader for DbHeadersStore {
    fn get_bits(&self, hash: Hash) -> Result<u32, StoreError> {
        Ok(self.access.read(hash)?.bits)
    }

    fn get_header(&self, hash: Hash) -> Result<Arc<Header>, StoreError> {
        self.access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }
}

pub struct StagingHeadersStore<'a> {
    store: &'a DbHeadersStore,
    staging_writes: BlockHashMap<Arc<Header>>,
}

impl<'a> StagingHeadersStore<'a> {
    pub fn new(store: &'a DbHeadersStore) -> Self {
        Self { store, staging_writes: BlockHashMap::new() }
    }

    pub fn insert(&mut self, header: Arc<Header>) -> Result<(), StoreError> {
        let hash = header.hash;
        if self.staging_writes.contains_key(&hash) || self.store.has(hash)? {
            return Err(StoreError::HashAlreadyExists(hash));
        }
        self.staging_writes.insert(hash, header);
        Ok(())
    }

    pub fn is_staged(&self) -> bool {
        !self.staging_writes.is_empty()
    }

    pub(crate) fn serialize(&self, batch: &mut WriteBatch) -> Result<(), StoreError> {
        for (hash, header) in self.staging_writes.iter() {
            self.store.insert_batch(batch, *hash, header)?;
        }
        Ok(())
    }

    pub(crate) fn update_cache(self) {
        for (hash, header) in self.staging_writes {
            self.store.access.update_cache(hash, header);
        }
    }
}

impl HeaderStoreReader for StagingHeadersStore<'_> {
    fn get_bits(&self, hash: Hash) -> Result<u32, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(header) => Ok(header.bits),
            None => self.store.get_bits(hash),
        }
    }

    fn get_header(&self, hash: Hash) -> Result<Arc<Header>, StoreError> {
        match self.staging_writes.get(&hash) {
            Some(header) => Ok(Arc::clone(header)),
            None => self.store.get_header(hash),
        }
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.staging_writes.contains_key(&hash) || self.store.has(hash)?)
    }
}
