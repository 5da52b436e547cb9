use crate::model::{
    staging::StagingArea,
    stores::{
        DB, ghostdag::DbGhostdagStore, headers::DbHeadersStore, headers_selected_tip::DbHeadersSelectedTipStore,
        reachability::DbReachabilityStore, relations::DbRelationsStore,
    },
};

use dagcore_consensus_core::config::{Config, constants::perf::StoreCacheParams};
use dagcore_database::prelude::CachePolicy;
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;

pub struct ConsensusStorage {
    // DB
    db: Arc<DB>,

    // Locked stores
    pub relations_store: Arc<RwLock<DbRelationsStore>>,
    pub reachability_store: Arc<RwLock<DbReachabilityStore>>,
    pub headers_selected_tip_store: Arc<RwLock<DbHeadersSelectedTipStore>>,

    // Append-only stores
    pub ghostdag_store: Arc<DbGhostdagStore>,
    pub headers_store: Arc<DbHeadersStore>,
}

impl ConsensusStorage {
    pub fn new(db: Arc<DB>, config: &Config) -> Arc<Self> {
        let perf_params = &config.perf;

        // Add stochastic noise to cache sizes to avoid predictable and equal sizes across all network nodes
        let noise = |size: usize| size + rand::thread_rng().gen_range(0..16);
        let policy = |params: StoreCacheParams| match params {
            StoreCacheParams { size: 0, .. } => CachePolicy::Empty,
            StoreCacheParams { size, preallocate: true } => CachePolicy::Preallocated(noise(size)),
            StoreCacheParams { size, preallocate: false } => CachePolicy::Count(noise(size)),
        };

        let relations_store = Arc::new(RwLock::new(DbRelationsStore::new(db.clone(), policy(perf_params.relations_cache))));
        let reachability_store = Arc::new(RwLock::new(DbReachabilityStore::new(db.clone(), policy(perf_params.reachability_cache))));
        let headers_selected_tip_store = Arc::new(RwLock::new(DbHeadersSelectedTipStore::new(db.clone())));

        // Compact ghostdag entries are small, so they get twice the full data budget
        let compact_ghostdag_cache =
            StoreCacheParams { size: perf_params.ghostdag_cache.size * 2, preallocate: perf_params.ghostdag_cache.preallocate };
        let ghostdag_store =
            Arc::new(DbGhostdagStore::new(db.clone(), policy(perf_params.ghostdag_cache), policy(compact_ghostdag_cache)));
        let headers_store = Arc::new(DbHeadersStore::new(db.clone(), policy(perf_params.headers_cache)));

        Arc::new(Self { db, relations_store, reachability_store, headers_selected_tip_store, ghostdag_store, headers_store })
    }

    pub fn db(&self) -> &Arc<DB> {
        &self.db
    }

    /// Creates a fresh staging area over all stores. Only one staging area may be alive at
    /// any given time, since each holds the upgradable read locks of the mutable stores
    pub fn staging(&self) -> StagingArea<'_> {
        StagingArea::new(self)
    }
}
