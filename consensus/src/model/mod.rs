pub mod services;
pub mod staging;
pub mod stores;
