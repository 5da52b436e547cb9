pub mod mergeset;
pub mod ordering;
pub mod protocol;

use crate::processes::reachability::ReachabilityError;
use dagcore_database::prelude::{StoreError, StoreErrorPredicates};
use dagcore_hashes::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhostdagError {
    #[error("missing GHOSTDAG data of ancestor {0}")]
    MissingAncestorData(Hash),

    #[error("block {0} is not in the blue set of the selected parent chain")]
    NotInBlueSet(Hash),

    #[error("data store error")]
    StoreError(#[from] StoreError),

    #[error("reachability error")]
    ReachabilityError(#[from] ReachabilityError),
}

impl GhostdagError {
    pub fn is_key_not_found(&self) -> bool {
        match self {
            GhostdagError::MissingAncestorData(_) => true,
            GhostdagError::StoreError(err) => err.is_key_not_found(),
            GhostdagError::ReachabilityError(err) => err.is_key_not_found(),
            GhostdagError::NotInBlueSet(_) => false,
        }
    }
}

pub type GhostdagResult<T> = std::result::Result<T, GhostdagError>;

/// Maps a store miss of `hash`'s GHOSTDAG record to [`GhostdagError::MissingAncestorData`]
pub(crate) fn missing_ancestor(hash: Hash) -> impl FnOnce(StoreError) -> GhostdagError {
    move |err| if err.is_key_not_found() { GhostdagError::MissingAncestorData(hash) } else { GhostdagError::StoreError(err) }
}
