use super::BlockProcessor;
use crate::{
    errors::{BlockProcessResult, RuleError},
    model::{
        staging::StagingArea,
        stores::{ghostdag::GhostdagData, headers::HeaderStoreReader, relations::RelationsStoreReader},
    },
    processes::reachability::inquirer,
};
use dagcore_consensus_core::{BlockHashSet, HashMapCustomHasher, header::Header};

impl BlockProcessor {
    pub(super) fn validate_header_in_isolation(&self, header: &Header) -> BlockProcessResult<()> {
        self.check_parents_limit(header)?;
        self.check_duplicate_parents(header)
    }

    pub(super) fn validate_parent_relations(&self, staging: &StagingArea, header: &Header) -> BlockProcessResult<()> {
        self.check_duplicate(staging, header)?;
        self.check_parents_exist(staging, header)?;
        self.check_parents_incest(staging, header)
    }

    pub(super) fn check_mergeset_size_limit(&self, ghostdag_data: &GhostdagData) -> BlockProcessResult<()> {
        let mergeset_size = ghostdag_data.mergeset_size() as u64;
        if mergeset_size > self.mergeset_size_limit {
            return Err(RuleError::MergeSetTooBig(mergeset_size, self.mergeset_size_limit));
        }
        Ok(())
    }

    fn check_parents_limit(&self, header: &Header) -> BlockProcessResult<()> {
        if header.direct_parents().is_empty() {
            return Err(RuleError::NoParents);
        }

        let max_block_parents = self.max_block_parents as usize;
        if header.direct_parents().len() > max_block_parents {
            return Err(RuleError::TooManyParents(header.direct_parents().len(), max_block_parents));
        }

        Ok(())
    }

    fn check_duplicate(&self, staging: &StagingArea, header: &Header) -> BlockProcessResult<()> {
        if staging.headers().has(header.hash)? {
            return Err(RuleError::DuplicateBlock(header.hash));
        }
        Ok(())
    }

    fn check_parents_exist(&self, staging: &StagingArea, header: &Header) -> BlockProcessResult<()> {
        let mut missing_parents = Vec::new();
        for parent in header.direct_parents() {
            if !staging.relations().has(*parent)? {
                missing_parents.push(*parent);
            }
        }
        if !missing_parents.is_empty() {
            return Err(RuleError::MissingParents(missing_parents));
        }
        Ok(())
    }

    fn check_duplicate_parents(&self, header: &Header) -> BlockProcessResult<()> {
        let mut seen = BlockHashSet::with_capacity(header.direct_parents().len());
        for parent in header.direct_parents() {
            if !seen.insert(*parent) {
                return Err(RuleError::DuplicateParents(*parent));
            }
        }
        Ok(())
    }

    fn check_parents_incest(&self, staging: &StagingArea, header: &Header) -> BlockProcessResult<()> {
        let parents = header.direct_parents();
        for parent_a in parents.iter() {
            for parent_b in parents.iter() {
                if parent_a == parent_b {
                    continue;
                }
                if inquirer::is_dag_ancestor_of(staging.reachability(), *parent_a, *parent_b)? {
                    return Err(RuleError::InvalidParentsRelation(*parent_a, *parent_b));
                }
            }
        }
        Ok(())
    }
}
