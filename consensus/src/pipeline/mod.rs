pub mod block_processor;

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ProcessingCounters {
    pub blocks_submitted: AtomicU64,
    pub blocks_rejected: AtomicU64,
    pub header_counts: AtomicU64,
    pub dep_counts: AtomicU64,
}

impl ProcessingCounters {
    pub fn snapshot(&self) -> ProcessingCountersSnapshot {
        ProcessingCountersSnapshot {
            blocks_submitted: self.blocks_submitted.load(Ordering::SeqCst),
            blocks_rejected: self.blocks_rejected.load(Ordering::SeqCst),
            header_counts: self.header_counts.load(Ordering::SeqCst),
            dep_counts: self.dep_counts.load(Ordering::SeqCst),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingCountersSnapshot {
    pub blocks_submitted: u64,
    pub blocks_rejected: u64,
    pub header_counts: u64,
    pub dep_counts: u64,
}
