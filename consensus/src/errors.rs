use crate::processes::{ghostdag::GhostdagError, reachability::ReachabilityError};
use dagcore_database::prelude::StoreError;
use dagcore_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("block has no parents")]
    NoParents,

    #[error("block has too many parents: got {0} when the limit is {1}")]
    TooManyParents(usize, usize),

    #[error("block lists parent {0} more than once")]
    DuplicateParents(Hash),

    #[error("block has missing parents: {0:?}")]
    MissingParents(Vec<Hash>),

    #[error("block {0} was already inserted")]
    DuplicateBlock(Hash),

    #[error("parent {0} is an ancestor of parent {1}")]
    InvalidParentsRelation(Hash, Hash),

    #[error("the block mergeset size {0} exceeds the limit of {1}")]
    MergeSetTooBig(u64, u64),

    #[error("data store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("GHOSTDAG error: {0}")]
    GhostdagError(#[from] GhostdagError),

    #[error("reachability error: {0}")]
    ReachabilityError(#[from] ReachabilityError),
}

pub type BlockProcessResult<T> = std::result::Result<T, RuleError>;
