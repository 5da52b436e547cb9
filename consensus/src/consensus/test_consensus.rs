use super::Consensus;
use crate::{
    errors::BlockProcessResult,
    model::{
        services::reachability::MTReachabilityService,
        stores::{ghostdag::GhostdagData, reachability::DbReachabilityStore},
    },
    processes::ghostdag::ordering::SortableBlock,
};
use dagcore_consensus_core::{config::Config, header::Header};
use dagcore_database::{
    create_temp_db,
    prelude::{ConnBuilder, StoreResult},
    utils::DbLifetime,
};
use dagcore_hashes::Hash;
use std::sync::Arc;

/// A consensus instance over a temporary DB, with helpers for building blocks from hashes
pub struct TestConsensus {
    consensus: Consensus,
    config: Config,
    // Dropped last, after all DB references held by `consensus`
    _db_lifetime: DbLifetime,
}

impl TestConsensus {
    pub fn new(config: &Config) -> Self {
        let (db_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let consensus = Consensus::new(db, config).unwrap();
        Self { consensus, config: config.clone(), _db_lifetime: db_lifetime }
    }

    pub fn genesis_hash(&self) -> Hash {
        self.config.genesis.hash
    }

    pub fn build_header_with_parents(&self, hash: Hash, parents: Vec<Hash>) -> Header {
        Header::new(hash, parents, self.config.genesis.bits)
    }

    pub fn add_block_with_parents(&self, hash: Hash, parents: Vec<Hash>) -> BlockProcessResult<Arc<GhostdagData>> {
        self.validate_and_insert_block(Arc::new(self.build_header_with_parents(hash, parents)))
    }

    pub fn validate_and_insert_block(&self, header: Arc<Header>) -> BlockProcessResult<Arc<GhostdagData>> {
        self.consensus.validate_and_insert_block(header)
    }

    pub fn ghostdag_data(&self, hash: Hash) -> StoreResult<Arc<GhostdagData>> {
        self.consensus.block_processor().ghostdag_data(hash)
    }

    pub fn headers_selected_tip(&self) -> StoreResult<SortableBlock> {
        self.consensus.block_processor().headers_selected_tip()
    }

    pub fn reachability_service(&self) -> &MTReachabilityService<DbReachabilityStore> {
        self.consensus.block_processor().reachability_service()
    }

    pub fn consensus(&self) -> &Consensus {
        &self.consensus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
