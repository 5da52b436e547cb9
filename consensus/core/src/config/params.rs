pub use super::{
    constants::consensus::*,
    genesis::{DEVNET_GENESIS, GENESIS, GenesisBlock, SIMNET_GENESIS, TESTNET_GENESIS},
};
use crate::KType;

/// Consensus parameters. Contains settings and configurations which are consensus-sensitive.
/// Changing one of these on a network node would exclude and prevent it from reaching consensus
/// with the other unmodified nodes.
#[derive(Clone, Debug)]
pub struct Params {
    pub name: &'static str,
    pub genesis: GenesisBlock,
    pub ghostdag_k: KType,
    pub max_block_parents: u8,
    pub mergeset_size_limit: u64,
}

impl Params {
    /// Returns the network name with its first letter capitalized, mostly for display purposes
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

pub const MAINNET_PARAMS: Params = Params {
    name: "mainnet",
    genesis: GENESIS,
    ghostdag_k: DEFAULT_GHOSTDAG_K,
    max_block_parents: DEFAULT_MAX_BLOCK_PARENTS,
    mergeset_size_limit: DEFAULT_MERGESET_SIZE_LIMIT,
};

/// Testnet runs at 10 blocks per second, hence the larger K and DAG width bounds
pub const TESTNET_PARAMS: Params = Params {
    name: "testnet",
    genesis: TESTNET_GENESIS,
    ghostdag_k: 124,
    max_block_parents: 16,
    mergeset_size_limit: 248,
};

pub const SIMNET_PARAMS: Params = Params {
    name: "simnet",
    genesis: SIMNET_GENESIS,
    ghostdag_k: DEFAULT_GHOSTDAG_K,
    max_block_parents: DEFAULT_MAX_BLOCK_PARENTS,
    mergeset_size_limit: DEFAULT_MERGESET_SIZE_LIMIT,
};

pub const DEVNET_PARAMS: Params = Params {
    name: "devnet",
    genesis: DEVNET_GENESIS,
    ghostdag_k: DEFAULT_GHOSTDAG_K,
    max_block_parents: DEFAULT_MAX_BLOCK_PARENTS,
    mergeset_size_limit: DEFAULT_MERGESET_SIZE_LIMIT,
};
