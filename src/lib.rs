pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod interfaces;
pub mod observability;
pub mod persistence;
pub mod staleness;
pub mod types;
pub mod utils;
pub mod weighting;
