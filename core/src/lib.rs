extern crate self as dagcore_core;

pub mod log;
pub mod time;
