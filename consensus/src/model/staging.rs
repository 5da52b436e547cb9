//!
//! Per-operation write buffer spanning all consensus stores.
//!
//! A [`StagingArea`] is created for a single logical operation (usually the insertion of one
//! block), receives all of its writes and is consumed by [`StagingArea::commit`]. Reads through
//! the staging area observe staged data first, then the store caches, then the DB.
//!

use crate::consensus::storage::ConsensusStorage;

use super::stores::{
    DB,
    ghostdag::StagingGhostdagStore,
    headers::StagingHeadersStore,
    headers_selected_tip::StagingHeadersSelectedTipStore,
    reachability::StagingReachabilityStore,
    relations::StagingRelationsStore,
};
use dagcore_database::prelude::StoreResult;
use rocksdb::WriteBatch;

/// Identifies a logical store shard within a [`StagingArea`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StagingShardId {
    Relations,
    Ghostdag,
    Reachability,
    Headers,
    HeadersSelectedTip,
}

pub struct StagingArea<'a> {
    relations: StagingRelationsStore<'a>,
    reachability: StagingReachabilityStore<'a>,
    headers_selected_tip: StagingHeadersSelectedTipStore<'a>,
    ghostdag: StagingGhostdagStore<'a>,
    headers: StagingHeadersStore<'a>,
}

impl<'a> StagingArea<'a> {
    pub fn new(storage: &'a ConsensusStorage) -> Self {
        // Locks are always acquired in this order
        let relations = StagingRelationsStore::new(storage.relations_store.upgradable_read());
        let reachability = StagingReachabilityStore::new(storage.reachability_store.upgradable_read());
        let headers_selected_tip = StagingHeadersSelectedTipStore::new(storage.headers_selected_tip_store.upgradable_read());
        Self {
            relations,
            reachability,
            headers_selected_tip,
            ghostdag: StagingGhostdagStore::new(&storage.ghostdag_store),
            headers: StagingHeadersStore::new(&storage.headers_store),
        }
    }

    pub fn relations(&self) -> &StagingRelationsStore<'a> {
        &self.relations
    }

    pub fn relations_mut(&mut self) -> &mut StagingRelationsStore<'a> {
        &mut self.relations
    }

    pub fn ghostdag(&self) -> &StagingGhostdagStore<'a> {
        &self.ghostdag
    }

    pub fn ghostdag_mut(&mut self) -> &mut StagingGhostdagStore<'a> {
        &mut self.ghostdag
    }

    pub fn reachability(&self) -> &StagingReachabilityStore<'a> {
        &self.reachability
    }

    pub fn reachability_mut(&mut self) -> &mut StagingReachabilityStore<'a> {
        &mut self.reachability
    }

    /// Reachability insertion reads ghostdag data while mutating reachability data
    pub fn reachability_and_ghostdag_mut(&mut self) -> (&mut StagingReachabilityStore<'a>, &StagingGhostdagStore<'a>) {
        (&mut self.reachability, &self.ghostdag)
    }

    pub fn headers(&self) -> &StagingHeadersStore<'a> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut StagingHeadersStore<'a> {
        &mut self.headers
    }

    pub fn headers_selected_tip(&self) -> &StagingHeadersSelectedTipStore<'a> {
        &self.headers_selected_tip
    }

    pub fn headers_selected_tip_mut(&mut self) -> &mut StagingHeadersSelectedTipStore<'a> {
        &mut self.headers_selected_tip
    }

    pub fn is_staged(&self, shard: StagingShardId) -> bool {
        match shard {
            StagingShardId::Relations => self.relations.is_staged(),
            StagingShardId::Ghostdag => self.ghostdag.is_staged(),
            StagingShardId::Reachability => self.reachability.is_staged(),
            StagingShardId::Headers => self.headers.is_staged(),
            StagingShardId::HeadersSelectedTip => self.headers_selected_tip.is_staged(),
        }
    }

    /// Atomically persists all staged writes to `db`
    pub fn commit(self, db: &DB) -> StoreResult<()> {
        self.commit_with(|batch| Ok(db.write(batch)?))
    }

    /// Serializes all shards into a single batch and hands it to `write`. Caches are refreshed
    /// only if `write` succeeds; on any failure neither the DB nor the caches observe a change
    pub fn commit_with(self, write: impl FnOnce(WriteBatch) -> StoreResult<()>) -> StoreResult<()> {
        let mut batch = WriteBatch::default();
        self.relations.serialize(&mut batch)?;
        self.ghostdag.serialize(&mut batch)?;
        self.reachability.serialize(&mut batch)?;
        self.headers.serialize(&mut batch)?;
        self.headers_selected_tip.serialize(&mut batch)?;

        // Readers of the mutable stores are blocked from here until the caches are up to date
        let relations = self.relations.upgrade();
        let reachability = self.reachability.upgrade();
        let headers_selected_tip = self.headers_selected_tip.upgrade();

        write(batch)?;

        relations.update_cache();
        reachability.update_cache();
        headers_selected_tip.update_cache();
        self.ghostdag.update_cache();
        self.headers.update_cache();
        Ok(())
    }
}
