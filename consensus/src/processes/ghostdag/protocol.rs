use super::{GhostdagError, GhostdagResult, missing_ancestor, ordering::SortableBlock};
use crate::{
    model::{
        staging::StagingArea,
        stores::{
            ghostdag::{GhostdagData, GhostdagStoreReader},
            headers::HeaderStoreReader,
            relations::RelationsStoreReader,
        },
    },
    processes::{difficulty::calc_work, reachability::inquirer},
};
use dagcore_consensus_core::{
    BlockHashMap, BlueWorkType, HashKTypeMap, HashMapCustomHasher, KType,
    blockhash::{self, BlockHashExtensions, BlockHashes},
};
use dagcore_hashes::Hash;
use std::sync::Arc;

/// Computes GHOSTDAG data of new blocks over the data visible through a [`StagingArea`]
#[derive(Clone)]
pub struct GhostdagManager {
    k: KType,
}

impl GhostdagManager {
    pub fn new(k: KType) -> Self {
        Self { k }
    }

    pub fn k(&self) -> KType {
        self.k
    }

    /// GHOSTDAG data of a parentless block. The origin is the root of the selected parent chain
    pub fn origin_ghostdag_data() -> GhostdagData {
        GhostdagData::new(
            0,
            BlueWorkType::ZERO,
            blockhash::NONE,
            BlockHashes::new(Vec::new()),
            BlockHashes::new(Vec::new()),
            HashKTypeMap::new(BlockHashMap::new()),
        )
    }

    /// Returns the parent with the higher blue work, tie-breaking by hash. The result does not depend on argument order
    pub fn choose_selected_parent(&self, staging: &StagingArea, a: Hash, b: Hash) -> GhostdagResult<Hash> {
        let a_block = SortableBlock::new(a, staging.ghostdag().get_blue_work(a).map_err(missing_ancestor(a))?);
        let b_block = SortableBlock::new(b, staging.ghostdag().get_blue_work(b).map_err(missing_ancestor(b))?);
        Ok(a_block.max(b_block).hash)
    }

    pub fn find_selected_parent(&self, staging: &StagingArea, parents: impl IntoIterator<Item = Hash>) -> GhostdagResult<Hash> {
        let mut selected: Option<SortableBlock> = None;
        for parent in parents {
            let block = SortableBlock::new(parent, staging.ghostdag().get_blue_work(parent).map_err(missing_ancestor(parent))?);
            selected = Some(match selected {
                Some(current) => current.max(block),
                None => block,
            });
        }
        Ok(selected.map_or(blockhash::NONE, |block| block.hash))
    }

    /// Runs the GHOSTDAG protocol for `block`, whose relations must already be staged, and stages the resulting data.
    ///
    /// The function calculates mergeset blues by iterating over the blocks in the anticone of the new block
    /// selected parent (which is the parent with the highest blue work) and adds any block to the blue set
    /// if by adding it these conditions will not be violated:
    ///
    /// 1) |anticone-of-candidate-block ∩ blue-set-of-new-block| ≤ K
    ///
    /// 2) For every blue block in blue-set-of-new-block:
    ///    |(anticone-of-blue-block ∩ blue-set-new-block) ∪ {candidate-block}| ≤ K.
    ///    We validate this condition by maintaining a map `blues_anticone_sizes` for
    ///    each block which holds all the blue anticone sizes that were affected by
    ///    the new added blue blocks.
    ///    So to find out what is |anticone-of-blue ∩ blue-set-of-new-block| we just iterate in
    ///    the selected parent chain of the new block until we find an existing entry in
    ///    `blues_anticone_sizes`.
    ///
    /// For further details see the article https://eprint.iacr.org/2018/104.pdf
    pub fn ghostdag(&self, staging: &mut StagingArea, block: Hash) -> GhostdagResult<Arc<GhostdagData>> {
        let data = Arc::new(self.compute(staging, block)?);
        staging.ghostdag_mut().insert(block, Arc::clone(&data))?;
        Ok(data)
    }

    /// Computes GHOSTDAG data for `block` without staging it
    pub fn compute(&self, staging: &StagingArea, block: Hash) -> GhostdagResult<GhostdagData> {
        let parents = staging.relations().get_parents(block)?;
        if parents.is_empty() {
            return Ok(Self::origin_ghostdag_data());
        }

        // Run the GHOSTDAG parent selection algorithm
        let selected_parent = self.find_selected_parent(staging, parents.iter().copied())?;
        // Initialize new GHOSTDAG block data with the selected parent
        let mut new_block_data = Arc::new(GhostdagData::new_with_selected_parent(selected_parent, self.k));
        // Get the mergeset in consensus-agreed topological order (topological here means forward in time from blocks to children)
        let ordered_mergeset = self.ordered_mergeset_without_selected_parent(staging, selected_parent, &parents)?;

        for blue_candidate in ordered_mergeset.iter().copied() {
            match self.check_blue_candidate(staging, &new_block_data, blue_candidate)? {
                // No k-cluster violation found, we can now set the candidate block as blue
                ColoringOutput::Blue(blue_anticone_size, blues_anticone_sizes) => {
                    new_block_data.add_blue(blue_candidate, blue_anticone_size, &blues_anticone_sizes)
                }
                ColoringOutput::Red => new_block_data.add_red(blue_candidate),
            }
        }

        let selected_parent_data = staging.ghostdag().get_compact_data(selected_parent).map_err(missing_ancestor(selected_parent))?;
        let blue_score = selected_parent_data.blue_score + new_block_data.mergeset_blues.len() as u64;

        let mut blue_work = selected_parent_data.blue_work;
        for blue in new_block_data.mergeset_blues.iter().copied() {
            blue_work = blue_work.saturating_add(calc_work(staging.headers().get_bits(blue)?));
        }

        new_block_data.finalize_score_and_work(blue_score, blue_work);

        Ok(Arc::unwrap_or_clone(new_block_data))
    }

    fn check_blue_candidate_with_chain_block(
        &self,
        staging: &StagingArea,
        new_block_data: &GhostdagData,
        chain_block: &ChainBlock,
        blue_candidate: Hash,
        candidate_blues_anticone_sizes: &mut BlockHashMap<KType>,
        candidate_blue_anticone_size: &mut KType,
    ) -> GhostdagResult<ColoringState> {
        // If blue_candidate is in the future of chain_block, it means
        // that all remaining blues are in the past of chain_block and thus
        // in the past of blue_candidate. In this case we know for sure that
        // the anticone of blue_candidate will not exceed K, and we can mark
        // it as blue.
        //
        // The new block is always in the future of blue_candidate, so there's
        // no point in checking it.

        // We check if chain_block is not the new block by checking if it has a hash.
        if let Some(hash) = chain_block.hash {
            if inquirer::is_dag_ancestor_of(staging.reachability(), hash, blue_candidate)? {
                return Ok(ColoringState::Blue);
            }
        }

        for block in chain_block.data.mergeset_blues.iter().copied() {
            // Skip blocks that exist in the past of blue_candidate.
            if inquirer::is_dag_ancestor_of(staging.reachability(), block, blue_candidate)? {
                continue;
            }

            let block_blue_anticone_size = self.blue_anticone_size(staging, block, new_block_data)?;
            candidate_blues_anticone_sizes.insert(block, block_blue_anticone_size);

            if *candidate_blue_anticone_size == self.k {
                // k-cluster violation: The candidate's blue anticone exceeded k
                return Ok(ColoringState::Red);
            }
            *candidate_blue_anticone_size += 1;

            if block_blue_anticone_size >= self.k {
                // k-cluster violation: A block in candidate's blue anticone already
                // has k blue blocks in its own anticone
                return Ok(ColoringState::Red);
            }
        }

        Ok(ColoringState::Pending)
    }

    /// Returns the blue anticone size of `block` from the worldview of `context`.
    /// Expects `block` to be in the blue set of `context`
    fn blue_anticone_size(&self, staging: &StagingArea, block: Hash, context: &GhostdagData) -> GhostdagResult<KType> {
        let mut current_blues_anticone_sizes = HashKTypeMap::clone(&context.blues_anticone_sizes);
        let mut current_selected_parent = context.selected_parent;
        loop {
            if let Some(size) = current_blues_anticone_sizes.get(&block) {
                return Ok(*size);
            }

            if current_selected_parent.is_none() {
                return Err(GhostdagError::NotInBlueSet(block));
            }

            let data = staging.ghostdag().get_data(current_selected_parent).map_err(missing_ancestor(current_selected_parent))?;
            current_blues_anticone_sizes = HashKTypeMap::clone(&data.blues_anticone_sizes);
            current_selected_parent = data.selected_parent;
        }
    }

    fn check_blue_candidate(
        &self,
        staging: &StagingArea,
        new_block_data: &Arc<GhostdagData>,
        blue_candidate: Hash,
    ) -> GhostdagResult<ColoringOutput> {
        // The maximum length of new_block_data.mergeset_blues can be K+1 because
        // it contains the selected parent.
        if new_block_data.mergeset_blues.len() > self.k as usize {
            return Ok(ColoringOutput::Red);
        }

        let mut candidate_blues_anticone_sizes: BlockHashMap<KType> = BlockHashMap::with_capacity(self.k as usize);
        // Iterate over all blocks in the blue past of the new block that are not in the past
        // of blue_candidate, and check for each one of them if blue_candidate potentially
        // enlarges their blue anticone to be over K, or that they enlarge the blue anticone
        // of blue_candidate to be over K.
        let mut chain_block = ChainBlock { hash: None, data: Arc::clone(new_block_data) };
        let mut candidate_blue_anticone_size: KType = 0;

        loop {
            let state = self.check_blue_candidate_with_chain_block(
                staging,
                new_block_data,
                &chain_block,
                blue_candidate,
                &mut candidate_blues_anticone_sizes,
                &mut candidate_blue_anticone_size,
            )?;

            match state {
                ColoringState::Blue => return Ok(ColoringOutput::Blue(candidate_blue_anticone_size, candidate_blues_anticone_sizes)),
                ColoringState::Red => return Ok(ColoringOutput::Red),
                ColoringState::Pending => (), // continue looping
            }

            let selected_parent = chain_block.data.selected_parent;
            if selected_parent.is_none() {
                // The origin is an ancestor of every block, so the walk cannot pass it
                return Err(GhostdagError::NotInBlueSet(blue_candidate));
            }
            chain_block = ChainBlock {
                hash: Some(selected_parent),
                data: staging.ghostdag().get_data(selected_parent).map_err(missing_ancestor(selected_parent))?,
            };
        }
    }
}

/// Chain block with attached ghostdag data
struct ChainBlock {
    hash: Option<Hash>, // if set to `None`, signals being the new block
    data: Arc<GhostdagData>,
}

/// Represents the intermediate GHOSTDAG coloring state for the current candidate
enum ColoringState {
    Blue,
    Red,
    Pending,
}

/// Represents the final output of GHOSTDAG coloring for the current candidate
enum ColoringOutput {
    Blue(KType, BlockHashMap<KType>), // (blue anticone size, map of blue anticone sizes for each affected blue)
    Red,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        consensus::storage::ConsensusStorage,
        model::staging::StagingShardId,
        processes::{reachability::manager::ReachabilityManager, relations::RelationsStoreExtensions},
    };
    use dagcore_consensus_core::{
        config::{ConfigBuilder, constants::perf::PERF_PARAMS, params::SIMNET_PARAMS},
        header::Header,
    };
    use dagcore_database::{create_temp_db, prelude::ConnBuilder};

    fn add_block(manager: &GhostdagManager, staging: &mut StagingArea, hash: u64, parents: &[u64]) -> Arc<GhostdagData> {
        let parents: Vec<Hash> = parents.iter().copied().map(Hash::from).collect();
        staging.relations_mut().insert(hash.into(), BlockHashes::new(parents.clone())).unwrap();
        staging.headers_mut().insert(Arc::new(Header::from_precomputed_hash(hash.into(), parents))).unwrap();
        let data = manager.ghostdag(staging, hash.into()).unwrap();
        ReachabilityManager::from_perf_params(&PERF_PARAMS).add_block(staging, hash.into()).unwrap();
        data
    }

    /// Builds origin 1, two parallel children 3 and 2, and block 4 merging both
    fn two_parent_merge(k: KType) -> Arc<GhostdagData> {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let manager = GhostdagManager::new(k);

        let mut staging = storage.staging();
        add_block(&manager, &mut staging, 1, &[]);
        add_block(&manager, &mut staging, 3, &[1]);
        add_block(&manager, &mut staging, 2, &[1]);
        add_block(&manager, &mut staging, 4, &[2, 3])
    }

    #[test]
    fn test_origin() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let manager = GhostdagManager::new(config.params.ghostdag_k);

        let mut staging = storage.staging();
        let data = add_block(&manager, &mut staging, 1, &[]);
        assert_eq!(*data, GhostdagManager::origin_ghostdag_data());
        assert!(data.selected_parent.is_none());
        assert_eq!(data.blue_score, 0);
        assert_eq!(data.blue_work, BlueWorkType::ZERO);

        let data = add_block(&manager, &mut staging, 2, &[1]);
        assert_eq!(data.selected_parent, 1.into());
        assert_eq!(data.blue_score, 1);
        assert_eq!(data.blue_work, calc_work(0x207fffff));
        assert_eq!(data.mergeset_blues.as_slice(), &[Hash::from(1)]);
        assert!(data.mergeset_reds.is_empty());
    }

    #[test]
    fn test_two_parent_merge() {
        // Blocks 2 and 3 carry equal blue work, so the larger hash is selected
        for k in [1, 2, 18] {
            let data = two_parent_merge(k);
            assert_eq!(data.selected_parent, 3.into());
            assert_eq!(data.mergeset_blues.as_slice(), &[Hash::from(3), Hash::from(2)]);
            assert!(data.mergeset_reds.is_empty());
            assert_eq!(data.blue_score, 3);
            assert_eq!(data.blue_work, BlueWorkType::from(6u64));
            assert_eq!(data.blues_anticone_sizes.get(&Hash::from(2)), Some(&1));
            assert_eq!(data.blues_anticone_sizes.get(&Hash::from(3)), Some(&1));
        }

        let data = two_parent_merge(0);
        assert_eq!(data.selected_parent, 3.into());
        assert_eq!(data.mergeset_blues.as_slice(), &[Hash::from(3)]);
        assert_eq!(data.mergeset_reds.as_slice(), &[Hash::from(2)]);
        assert_eq!(data.blue_score, 2);
    }

    #[test]
    fn test_parents_in_selected_parent_past() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let manager = GhostdagManager::new(config.params.ghostdag_k);

        // 1 <- 2 <- 3, so any extra parent is already in the past of the selected parent 3
        let mut staging = storage.staging();
        add_block(&manager, &mut staging, 1, &[]);
        add_block(&manager, &mut staging, 2, &[1]);
        add_block(&manager, &mut staging, 3, &[2]);

        for (hash, parents) in [(4, vec![2, 3]), (5, vec![3, 1, 3])] {
            let data = add_block(&manager, &mut staging, hash, &parents);
            assert_eq!(data.selected_parent, 3.into());
            assert_eq!(data.mergeset_blues.as_slice(), &[Hash::from(3)]);
            assert!(data.mergeset_reds.is_empty());
            assert_eq!(data.mergeset_size(), 1);
            assert_eq!(data.blue_score, 3);
            assert_eq!(data.blue_work, BlueWorkType::from(6u64));
        }
    }

    #[test]
    fn test_k_cluster_bounds() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let k = 2;
        let manager = GhostdagManager::new(k);

        // Five parallel children of the origin, merged by a single block
        let mut staging = storage.staging();
        add_block(&manager, &mut staging, 1, &[]);
        for hash in 2..=6 {
            add_block(&manager, &mut staging, hash, &[1]);
        }
        let data = add_block(&manager, &mut staging, 7, &[2, 3, 4, 5, 6]);

        // The selected parent plus k more blues, the rest are red
        assert_eq!(data.selected_parent, 6.into());
        assert_eq!(data.mergeset_blues.as_slice(), &[Hash::from(6), Hash::from(2), Hash::from(3)]);
        assert_eq!(data.mergeset_reds.as_slice(), &[Hash::from(4), Hash::from(5)]);
        assert_eq!(data.blue_score, 1 + data.mergeset_blues.len() as u64);
        assert!(data.blues_anticone_sizes.values().all(|&size| size <= k));
        assert!(data.mergeset_blues.iter().all(|blue| data.blues_anticone_sizes.contains_key(blue)));
    }

    #[test]
    fn test_choose_selected_parent() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let manager = GhostdagManager::new(config.params.ghostdag_k);

        let mut staging = storage.staging();
        add_block(&manager, &mut staging, 1, &[]);
        add_block(&manager, &mut staging, 5, &[1]);
        add_block(&manager, &mut staging, 9, &[1]);
        add_block(&manager, &mut staging, 7, &[5]);

        // Equal blue work is resolved by hash regardless of argument order
        assert_eq!(manager.choose_selected_parent(&staging, 5.into(), 9.into()).unwrap(), 9.into());
        assert_eq!(manager.choose_selected_parent(&staging, 9.into(), 5.into()).unwrap(), 9.into());
        // Higher blue work wins over a higher hash
        assert_eq!(manager.choose_selected_parent(&staging, 7.into(), 9.into()).unwrap(), 7.into());
        assert_eq!(manager.find_selected_parent(&staging, [5.into(), 9.into(), 7.into()]).unwrap(), 7.into());
    }

    #[test]
    fn test_missing_ancestor_data() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let config = ConfigBuilder::new(SIMNET_PARAMS).build();
        let storage = ConsensusStorage::new(db, &config);
        let manager = GhostdagManager::new(config.params.ghostdag_k);

        let mut staging = storage.staging();
        add_block(&manager, &mut staging, 1, &[]);
        // Relations of 2 are known but its GHOSTDAG data was never computed
        staging.relations_mut().insert(2.into(), BlockHashes::new(vec![1.into()])).unwrap();
        staging.relations_mut().insert(3.into(), BlockHashes::new(vec![2.into()])).unwrap();

        let err = manager.ghostdag(&mut staging, 3.into()).unwrap_err();
        assert!(matches!(err, GhostdagError::MissingAncestorData(hash) if hash == Hash::from(2)));
        assert!(err.is_key_not_found());
        assert!(!staging.ghostdag().has(3.into()).unwrap());
        assert!(staging.is_staged(StagingShardId::Ghostdag));
    }
}
