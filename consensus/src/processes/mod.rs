pub mod dag_topology;
pub mod difficulty;
pub mod ghostdag;
pub mod reachability;
pub mod relations;
