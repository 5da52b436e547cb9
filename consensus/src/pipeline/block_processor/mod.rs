mod pre_ghostdag_validation;
pub mod processor;

pub use processor::BlockProcessor;
