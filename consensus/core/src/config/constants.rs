pub mod consensus {
    //!
    //! A module for constants which directly impact consensus.
    //!

    use crate::KType;

    /// Default K for 1 BPS networks
    pub const DEFAULT_GHOSTDAG_K: KType = 18;

    /// Default upper bound on the number of direct parents of a block
    pub const DEFAULT_MAX_BLOCK_PARENTS: u8 = 10;

    /// Default upper bound on the mergeset size of a block
    pub const DEFAULT_MERGESET_SIZE_LIMIT: u64 = DEFAULT_GHOSTDAG_K as u64 * 10;
}

pub mod perf {
    //!
    //! A module for performance critical constants which depend on consensus parameters.
    //! The constants in this module should all be revisited if mainnet consensus parameters change.
    //!

    /// The default blue score gap between the selected tip and the reindex root,
    /// above which the reindex root is advanced towards the tip.
    pub const DEFAULT_REINDEX_WINDOW: u64 = 200;

    /// The default slack interval used by the reachability
    /// algorithm to encounter for blocks out of the selected chain.
    pub const DEFAULT_REINDEX_SLACK: u64 = 1 << 12;

    /// Cache sizing for a single store. Sizes count entries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StoreCacheParams {
        pub size: usize,
        /// Allocate the cache storage upfront instead of growing on demand
        pub preallocate: bool,
    }

    impl StoreCacheParams {
        pub const fn new(size: usize) -> Self {
            Self { size, preallocate: false }
        }

        pub const fn preallocated(size: usize) -> Self {
            Self { size, preallocate: true }
        }
    }

    #[derive(Clone, Debug)]
    pub struct PerfParams {
        //
        // Reachability
        //
        pub reindex_window: u64,
        pub reindex_slack: u64,

        //
        // Cache sizes
        //
        pub relations_cache: StoreCacheParams,
        pub ghostdag_cache: StoreCacheParams,
        pub reachability_cache: StoreCacheParams,
        pub headers_cache: StoreCacheParams,
    }

    pub const PERF_PARAMS: PerfParams = PerfParams {
        reindex_window: DEFAULT_REINDEX_WINDOW,
        reindex_slack: DEFAULT_REINDEX_SLACK,
        relations_cache: StoreCacheParams::new(100_000),
        ghostdag_cache: StoreCacheParams::new(50_000),
        reachability_cache: StoreCacheParams::new(100_000),
        headers_cache: StoreCacheParams::new(10_000),
    };
}
