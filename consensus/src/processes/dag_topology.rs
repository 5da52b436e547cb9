use crate::{
    model::{staging::StagingArea, stores::relations::RelationsStoreReader},
    processes::{
        reachability::{Result, inquirer},
        relations::RelationsStoreExtensions,
    },
};
use dagcore_consensus_core::blockhash::BlockHashes;
use dagcore_database::prelude::StoreResult;
use dagcore_hashes::Hash;

/// Answers topological queries over the relations and reachability data visible through a [`StagingArea`].
/// Ancestry queries are reflexive: every block is an ancestor of itself
#[derive(Clone, Default)]
pub struct DagTopologyManager;

impl DagTopologyManager {
    pub fn new() -> Self {
        Self
    }

    pub fn parents(&self, staging: &StagingArea, block: Hash) -> StoreResult<BlockHashes> {
        staging.relations().get_parents(block)
    }

    pub fn children(&self, staging: &StagingArea, block: Hash) -> StoreResult<BlockHashes> {
        staging.relations().get_children(block)
    }

    pub fn is_parent_of(&self, staging: &StagingArea, parent: Hash, child: Hash) -> StoreResult<bool> {
        Ok(staging.relations().get_parents(child)?.contains(&parent))
    }

    pub fn is_child_of(&self, staging: &StagingArea, child: Hash, parent: Hash) -> StoreResult<bool> {
        Ok(staging.relations().get_children(parent)?.contains(&child))
    }

    pub fn is_ancestor_of(&self, staging: &StagingArea, ancestor: Hash, descendant: Hash) -> Result<bool> {
        inquirer::is_dag_ancestor_of(staging.reachability(), ancestor, descendant)
    }

    /// Checks whether `ancestor` is an ancestor of at least one of `descendants`
    pub fn is_ancestor_of_any(&self, staging: &StagingArea, ancestor: Hash, descendants: &[Hash]) -> Result<bool> {
        for descendant in descendants.iter().copied() {
            if inquirer::is_dag_ancestor_of(staging.reachability(), ancestor, descendant)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks whether at least one of `ancestors` is an ancestor of `descendant`
    pub fn is_any_ancestor_of(&self, staging: &StagingArea, ancestors: &[Hash], descendant: Hash) -> Result<bool> {
        for ancestor in ancestors.iter().copied() {
            if inquirer::is_dag_ancestor_of(staging.reachability(), ancestor, descendant)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks whether `block` lies on the selected parent chain of `chain_tip`, which is exactly
    /// the reachability tree path from the origin to `chain_tip`
    pub fn is_in_selected_parent_chain_of(&self, staging: &StagingArea, block: Hash, chain_tip: Hash) -> Result<bool> {
        inquirer::is_chain_ancestor_of(staging.reachability(), block, chain_tip)
    }

    /// Sets the parents of `block`, creating its relations entry if it does not exist yet
    pub fn set_parents(&self, staging: &mut StagingArea, block: Hash, parents: BlockHashes) -> StoreResult<()> {
        let relations = staging.relations_mut();
        if relations.has(block)? { relations.replace_parents(block, parents) } else { relations.insert(block, parents) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consensus::storage::ConsensusStorage,
        processes::{ghostdag::protocol::GhostdagManager, reachability::manager::ReachabilityManager},
    };
    use dagcore_consensus_core::{
        config::{ConfigBuilder, params::SIMNET_PARAMS},
        header::Header,
    };
    use dagcore_database::{create_temp_db, prelude::ConnBuilder};
    use std::sync::Arc;

    #[test]
    fn test_topology_queries() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db.clone(), &config);
        let topology = DagTopologyManager::new();
        let ghostdag = GhostdagManager::new(config.params.ghostdag_k);
        let reachability = ReachabilityManager::from_perf_params(&config.perf);

        //      1
        //    /   \
        //   2     3
        //   |   /   \
        //   4  5     6
        //    \ |
        //      7
        let mut staging = storage.staging();
        for (hash, parents) in [(1u64, vec![]), (2, vec![1u64]), (3, vec![1]), (4, vec![2]), (5, vec![3]), (6, vec![3]), (7, vec![4, 5])] {
            let parents: Vec<Hash> = parents.into_iter().map(Hash::from).collect();
            topology.set_parents(&mut staging, hash.into(), BlockHashes::new(parents.clone())).unwrap();
            staging.headers_mut().insert(Arc::new(Header::from_precomputed_hash(hash.into(), parents))).unwrap();
            ghostdag.ghostdag(&mut staging, hash.into()).unwrap();
            reachability.add_block(&mut staging, hash.into()).unwrap();
        }
        staging.commit(&db).unwrap();

        let staging = storage.staging();
        assert_eq!(topology.parents(&staging, 7.into()).unwrap().as_slice(), &[Hash::from(4), Hash::from(5)]);
        assert_eq!(topology.children(&staging, 3.into()).unwrap().as_slice(), &[Hash::from(5), Hash::from(6)]);
        assert!(topology.is_parent_of(&staging, 5.into(), 7.into()).unwrap());
        assert!(!topology.is_parent_of(&staging, 3.into(), 7.into()).unwrap());
        assert!(topology.is_child_of(&staging, 6.into(), 3.into()).unwrap());
        assert!(!topology.is_child_of(&staging, 7.into(), 3.into()).unwrap());

        assert!(topology.is_ancestor_of(&staging, 3.into(), 7.into()).unwrap());
        assert!(topology.is_ancestor_of(&staging, 7.into(), 7.into()).unwrap());
        assert!(!topology.is_ancestor_of(&staging, 6.into(), 7.into()).unwrap());
        assert!(!topology.is_ancestor_of(&staging, 7.into(), 3.into()).unwrap());
        assert!(topology.is_ancestor_of_any(&staging, 2.into(), &[6.into(), 7.into()]).unwrap());
        assert!(!topology.is_ancestor_of_any(&staging, 2.into(), &[5.into(), 6.into()]).unwrap());
        assert!(topology.is_any_ancestor_of(&staging, &[6.into(), 5.into()], 7.into()).unwrap());
        assert!(!topology.is_any_ancestor_of(&staging, &[6.into(), 2.into()], 5.into()).unwrap());

        // Each selected parent chain runs through the tree path to the origin
        let chain_tip_parent = ghostdag.find_selected_parent(&staging, [4.into(), 5.into()]).unwrap();
        assert!(topology.is_in_selected_parent_chain_of(&staging, chain_tip_parent, 7.into()).unwrap());
        assert!(topology.is_in_selected_parent_chain_of(&staging, 1.into(), 7.into()).unwrap());
        assert!(!topology.is_in_selected_parent_chain_of(&staging, 6.into(), 7.into()).unwrap());
    }

    #[test]
    fn test_set_parents_replaces_existing() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let topology = DagTopologyManager::new();

        let mut staging = storage.staging();
        topology.set_parents(&mut staging, 1.into(), BlockHashes::new(vec![])).unwrap();
        topology.set_parents(&mut staging, 2.into(), BlockHashes::new(vec![1.into()])).unwrap();
        topology.set_parents(&mut staging, 3.into(), BlockHashes::new(vec![1.into()])).unwrap();
        topology.set_parents(&mut staging, 3.into(), BlockHashes::new(vec![2.into()])).unwrap();

        assert_eq!(topology.children(&staging, 1.into()).unwrap().as_slice(), &[Hash::from(2)]);
        assert_eq!(topology.children(&staging, 2.into()).unwrap().as_slice(), &[Hash::from(3)]);
        assert!(topology.is_parent_of(&staging, 2.into(), 3.into()).unwrap());
    }
}
