use crate::{
    consensus::storage::ConsensusStorage,
    errors::BlockProcessResult,
    model::{
        services::reachability::MTReachabilityService,
        staging::StagingArea,
        stores::{
            ghostdag::{GhostdagData, GhostdagStoreReader},
            headers::HeaderStoreReader,
            headers_selected_tip::{HeadersSelectedTipStore, HeadersSelectedTipStoreReader},
            reachability::DbReachabilityStore,
        },
    },
    pipeline::ProcessingCounters,
    processes::{
        dag_topology::DagTopologyManager,
        ghostdag::{ordering::SortableBlock, protocol::GhostdagManager},
        reachability::manager::ReachabilityManager,
    },
};
use dagcore_consensus_core::{
    blockhash::BlockHashes,
    config::{Config, genesis::GenesisBlock},
    header::Header,
};
use dagcore_core::{debug, info, time::Stopwatch, trace, warn};
use dagcore_database::prelude::StoreResult;
use dagcore_hashes::Hash;
use std::sync::{Arc, atomic::Ordering};

/// Inserts headers into consensus one at a time. Every insertion stages all derived data and
/// commits it atomically, so a rejected header leaves no trace in the stores
pub struct BlockProcessor {
    // Config
    pub(super) genesis: GenesisBlock,
    pub(super) max_block_parents: u8,
    pub(super) mergeset_size_limit: u64,

    // Stores
    storage: Arc<ConsensusStorage>,

    // Managers and services
    ghostdag_manager: GhostdagManager,
    reachability_manager: ReachabilityManager,
    dag_topology_manager: DagTopologyManager,
    reachability_service: MTReachabilityService<DbReachabilityStore>,

    // Counters
    counters: Arc<ProcessingCounters>,
}

impl BlockProcessor {
    pub fn new(config: &Config, storage: Arc<ConsensusStorage>, counters: Arc<ProcessingCounters>) -> Self {
        Self {
            genesis: config.genesis,
            max_block_parents: config.max_block_parents,
            mergeset_size_limit: config.mergeset_size_limit,
            ghostdag_manager: GhostdagManager::new(config.ghostdag_k),
            reachability_manager: ReachabilityManager::from_perf_params(&config.perf),
            dag_topology_manager: DagTopologyManager::new(),
            reachability_service: MTReachabilityService::new(storage.reachability_store.clone()),
            storage,
            counters,
        }
    }

    /// Inserts the genesis block as the origin of the DAG. Does nothing if it is already known
    pub fn init_genesis(&self) -> BlockProcessResult<()> {
        let hash = self.genesis.hash;
        let mut staging = self.storage.staging();
        if staging.headers().has(hash)? {
            return Ok(());
        }

        let header = Arc::new(Header::new(hash, Vec::new(), self.genesis.bits));
        let ghostdag_data = self.stage_block(&mut staging, &header)?;
        staging.headers_selected_tip_mut().set(SortableBlock::new(hash, ghostdag_data.blue_work))?;
        staging.commit(self.storage.db())?;

        info!("Initialized consensus with genesis block {}", hash);
        Ok(())
    }

    /// Validates and inserts `header`, returning its GHOSTDAG data
    pub fn insert_block(&self, header: Arc<Header>) -> BlockProcessResult<Arc<GhostdagData>> {
        let _sw = Stopwatch::<500>::with_threshold("insert_block");
        self.counters.blocks_submitted.fetch_add(1, Ordering::Relaxed);

        let res = self.process_header(&header);
        match &res {
            Ok(ghostdag_data) => {
                self.counters.header_counts.fetch_add(1, Ordering::Relaxed);
                self.counters.dep_counts.fetch_add(header.direct_parents().len() as u64, Ordering::Relaxed);
                trace!("Inserted block {} with blue score {}", header.hash, ghostdag_data.blue_score);
            }
            Err(err) => {
                self.counters.blocks_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Rejected block {}: {}", header.hash, err);
            }
        }
        res
    }

    fn process_header(&self, header: &Arc<Header>) -> BlockProcessResult<Arc<GhostdagData>> {
        self.validate_header_in_isolation(header)?;

        let mut staging = self.storage.staging();
        self.validate_parent_relations(&staging, header)?;

        let ghostdag_data = self.stage_block(&mut staging, header)?;

        // Update the selected tip and hint reachability about it
        let prev_tip = staging.headers_selected_tip().get()?;
        if self.ghostdag_manager.choose_selected_parent(&staging, prev_tip.hash, header.hash)? == header.hash {
            debug!("Headers selected tip moved from {} to {}", prev_tip.hash, header.hash);
            staging.headers_selected_tip_mut().set(SortableBlock::new(header.hash, ghostdag_data.blue_work))?;
            self.reachability_manager.update_reindex_root(&mut staging, header.hash)?;
        }

        staging.commit(self.storage.db())?;
        Ok(ghostdag_data)
    }

    /// Stages relations, header, GHOSTDAG data and reachability data of a new block
    fn stage_block(&self, staging: &mut StagingArea, header: &Arc<Header>) -> BlockProcessResult<Arc<GhostdagData>> {
        self.dag_topology_manager.set_parents(staging, header.hash, BlockHashes::clone(&header.parents))?;
        staging.headers_mut().insert(header.clone())?;
        let ghostdag_data = self.ghostdag_manager.ghostdag(staging, header.hash)?;
        self.check_mergeset_size_limit(&ghostdag_data)?;
        self.reachability_manager.add_block(staging, header.hash)?;
        Ok(ghostdag_data)
    }

    pub fn ghostdag_data(&self, hash: Hash) -> StoreResult<Arc<GhostdagData>> {
        self.storage.ghostdag_store.get_data(hash)
    }

    pub fn header(&self, hash: Hash) -> StoreResult<Arc<Header>> {
        self.storage.headers_store.get_header(hash)
    }

    pub fn headers_selected_tip(&self) -> StoreResult<SortableBlock> {
        self.storage.headers_selected_tip_store.read().get()
    }

    pub fn reachability_service(&self) -> &MTReachabilityService<DbReachabilityStore> {
        &self.reachability_service
    }

    pub fn ghostdag_manager(&self) -> &GhostdagManager {
        &self.ghostdag_manager
    }

    pub fn dag_topology_manager(&self) -> &DagTopologyManager {
        &self.dag_topology_manager
    }

    pub fn storage(&self) -> &Arc<ConsensusStorage> {
        &self.storage
    }
}
