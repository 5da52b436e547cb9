use crate::blockhash::BlockHashes;
use dagcore_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The consensus-relevant part of a block header. The hash is computed by the
/// (external) wire layer and carried along as an opaque identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub hash: Hash,
    pub parents: BlockHashes,
    /// Compact encoding of the block difficulty target
    pub bits: u32,
}

impl Header {
    pub fn new(hash: Hash, parents: Vec<Hash>, bits: u32) -> Self {
        Self { hash, parents: Arc::new(parents), bits }
    }

    /// Builds a header with the easiest possible target, mostly useful for tests
    pub fn from_precomputed_hash(hash: Hash, parents: Vec<Hash>) -> Self {
        Self::new(hash, parents, 0x207fffff)
    }

    pub fn direct_parents(&self) -> &[Hash] {
        &self.parents
    }

    pub fn is_origin(&self) -> bool {
        self.parents.is_empty()
    }
}
