pub mod ghostdag;
pub mod headers;
pub mod headers_selected_tip;
pub mod reachability;
pub mod relations;

pub use dagcore_database;
pub use dagcore_database::prelude::DB;
