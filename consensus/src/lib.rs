//! # Consensus core of a blockDAG node
//!
//! Blocks are ordered with the GHOSTDAG protocol while a reachability index answers ancestry
//! queries in sub-linear time. All data derived for a new block flows through a
//! [`StagingArea`](model::staging::StagingArea) and is persisted by a single atomic commit.
//!
//! ## Store relationships
//!
//! Let **H**, **R**, **G** and **C** be the sets of blocks with a header, relations, GHOSTDAG and
//! reachability entry respectively. After every commit
//!
//! ```text
//! H = R = G = C
//! ```
//!
//! since a block is staged into all four stores before the commit. Implications:
//!
//! - A block may only be inserted once all of its parents are in **R**.
//! - The selected parent chain of every block ends at the origin, the single block with no parents.

pub mod consensus;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod processes;
