pub mod storage;
pub mod test_consensus;

use crate::{
    errors::BlockProcessResult,
    model::stores::{DB, ghostdag::GhostdagData},
    pipeline::{ProcessingCounters, block_processor::BlockProcessor},
};
use dagcore_consensus_core::{config::Config, header::Header};
use std::sync::Arc;
use storage::ConsensusStorage;

/// Bundles the consensus stores with the processor inserting blocks into them
pub struct Consensus {
    // Stores
    storage: Arc<ConsensusStorage>,

    // Processors
    block_processor: BlockProcessor,

    // Counters
    pub counters: Arc<ProcessingCounters>,
}

impl Consensus {
    /// Opens consensus over `db`, inserting the genesis block unless the config says otherwise
    pub fn new(db: Arc<DB>, config: &Config) -> BlockProcessResult<Self> {
        let storage = ConsensusStorage::new(db, config);
        let counters = Arc::new(ProcessingCounters::default());
        let block_processor = BlockProcessor::new(config, storage.clone(), counters.clone());
        if config.process_genesis {
            block_processor.init_genesis()?;
        }
        Ok(Self { storage, block_processor, counters })
    }

    pub fn validate_and_insert_block(&self, header: Arc<Header>) -> BlockProcessResult<Arc<GhostdagData>> {
        self.block_processor.insert_block(header)
    }

    pub fn block_processor(&self) -> &BlockProcessor {
        &self.block_processor
    }

    pub fn storage(&self) -> &Arc<ConsensusStorage> {
        &self.storage
    }
}
