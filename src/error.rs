use std::path::PathBuf;
use thiserror::Error;
use crate::types::ids::InstrumentId;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Factor source not found: {path:?}")]
    MissingFactorSource {
        path: PathBuf,
    },

    #[error("Invalid factor {name}: {value} (must be positive)")]
    InvalidFactor {
        name: &'static str,
        value: f64,
    },

    // Input Errors
    #[error("No input file matching {prefix}* in {dir:?}")]
    NoInputFile {
        dir: PathBuf,
        prefix: String,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // Selection Errors
    #[error("Empty quote group for instrument {0}")]
    EmptyInstrumentGroup(InstrumentId),

    // Export Errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // System Errors
    #[error("Metrics error: {0}")]
    MetricsError(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    // IO Errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
