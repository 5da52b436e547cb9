use crate::db::DB;
use rocksdb::{BlockBasedOptions, DBCompressionType};
use std::{path::PathBuf, sync::Arc};

const KB: usize = 1024;
const MB: usize = 1024 * KB;

#[derive(Debug)]
pub struct Unspecified;

/// Typestate builder for opening a [`DB`]. A path must be set before `build` becomes available
#[derive(Debug)]
pub struct ConnBuilder<Path> {
    db_path: Path,
    create_if_missing: bool,
    parallelism: usize,
    files_limit: i32,
    mem_budget: usize,
}

impl Default for ConnBuilder<Unspecified> {
    fn default() -> Self {
        ConnBuilder { db_path: Unspecified, create_if_missing: true, parallelism: 1, files_limit: 500, mem_budget: 64 * MB }
    }
}

impl<Path> ConnBuilder<Path> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf> {
        ConnBuilder {
            db_path,
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            files_limit: self.files_limit,
            mem_budget: self.mem_budget,
        }
    }
    pub fn with_create_if_missing(self, create_if_missing: bool) -> ConnBuilder<Path> {
        ConnBuilder { create_if_missing, ..self }
    }
    pub fn with_parallelism(self, parallelism: impl Into<usize>) -> ConnBuilder<Path> {
        ConnBuilder { parallelism: parallelism.into(), ..self }
    }
    pub fn with_mem_budget(self, mem_budget: impl Into<usize>) -> ConnBuilder<Path> {
        ConnBuilder { mem_budget: mem_budget.into(), ..self }
    }
    pub fn with_files_limit(self, files_limit: impl Into<i32>) -> ConnBuilder<Path> {
        ConnBuilder { files_limit: files_limit.into(), ..self }
    }
}

impl ConnBuilder<PathBuf> {
    fn options(&self) -> rocksdb::Options {
        let mut opts = rocksdb::Options::default();
        if self.parallelism > 1 {
            opts.increase_parallelism(self.parallelism as i32);
        }
        opts.set_max_background_jobs((num_cpus::get() / 2).max(1) as i32);
        opts.optimize_level_style_compaction(self.mem_budget);
        opts.set_compression_per_level(&[
            DBCompressionType::None,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
        ]);
        opts.set_level_compaction_dynamic_level_bytes(true);
        opts.set_keep_log_file_num(1);

        let mut b_opts = BlockBasedOptions::default();
        b_opts.set_bloom_filter(10.0, false);
        b_opts.set_block_size(16 * KB);
        opts.set_block_based_table_factory(&b_opts);

        opts.set_max_open_files(self.files_limit);
        opts.create_if_missing(self.create_if_missing);
        opts
    }

    pub fn build(self) -> Result<Arc<DB>, rocksdb::Error> {
        let opts = self.options();
        let db = DB::open(&opts, &self.db_path)?;
        Ok(Arc::new(db))
    }
}
