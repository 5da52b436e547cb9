use crate::processes::ghostdag::ordering::SortableBlock;
use dagcore_database::prelude::{BatchDbWriter, CachedDbItem, DB, StoreResult};
use dagcore_database::registry::DatabaseStorePrefixes;
use parking_lot::{RwLockUpgradableReadGuard, RwLockWriteGuard};
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `SelectedTipStore`.
pub trait HeadersSelectedTipStoreReader {
    fn get(&self) -> StoreResult<SortableBlock>;
}

pub trait HeadersSelectedTipStore: HeadersSelectedTipStoreReader {
    fn set(&mut self, block: SortableBlock) -> StoreResult<()>;
}

/// A DB + cache implementation of `HeadersSelectedTipStoreReader`
#[derive(Clone)]
pub struct DbHeadersSelectedTipStore {
    db: Arc<DB>,
    access: CachedDbItem<SortableBlock>,
}

impl DbHeadersSelectedTipStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbItem::new(db, DatabaseStorePrefixes::HeadersSelectedTip.into()) }
    }

    pub fn clone_with_new_cache(&self) -> Self {
        Self::new(Arc::clone(&self.db))
    }
}

impl HeadersSelectedTipStoreReader for DbHeadersSelectedTipStore {
    fn get(&self) -> StoreResult<SortableBlock> {
        self.access.read()
    }
}

pub struct StagingHeadersSelectedTipStore<'a> {
    store_read: RwLockUpgradableReadGuard<'a, DbHeadersSelectedTipStore>,
    staging_tip: Option<SortableBlock>,
}

impl<'a> StagingHeadersSelectedTipStore<'a> {
    pub fn new(store_read: RwLockUpgradableReadGuard<'a, DbHeadersSelectedTipStore>) -> Self {
        Self { store_read, staging_tip: None }
    }

    pub fn is_staged(&self) -> bool {
        self.staging_tip.is_some()
    }

    pub(crate) fn serialize(&self, batch: &mut WriteBatch) -> StoreResult<()> {
        if let Some(tip) = self.staging_tip.as_ref() {
            self.store_read.access.write_without_cache(BatchDbWriter::new(batch), tip)?;
        }
        Ok(())
    }

    pub(crate) fn upgrade(self) -> HeadersSelectedTipWriteGuard<'a> {
        HeadersSelectedTipWriteGuard { store_write: RwLockUpgradableReadGuard::upgrade(self.store_read), staging_tip: self.staging_tip }
    }
}

pub(crate) struct HeadersSelectedTipWriteGuard<'a> {
    store_write: RwLockWriteGuard<'a, DbHeadersSelectedTipStore>,
    staging_tip: Option<SortableBlock>,
}

impl HeadersSelectedTipWriteGuard<'_> {
    pub(crate) fn update_cache(mut self) {
        if let Some(tip) = self.staging_tip {
            self.store_write.access.update_cache(tip);
        }
    }
}

impl HeadersSelectedTipStoreReader for StagingHeadersSelectedTipStore<'_> {
    fn get(&self) -> StoreResult<SortableBlock> {
        match self.staging_tip {
            Some(tip) => Ok(tip),
            None => self.store_read.get(),
        }
    }
}

impl HeadersSelectedTipStore for StagingHeadersSelectedTipStore<'_> {
    fn set(&mut self, block: SortableBlock) -> StoreResult<()> {
        self.staging_tip = Some(block);
        Ok(())
    }
}
