use std::path::PathBuf;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::config::FactorConfig;

/// Summary written beside each day's exports so a published file can be
/// traced back to the run and inputs that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    pub clock: NaiveDateTime,
    pub factors: FactorConfig,
    pub quotes: usize,
    pub excluded_stale: usize,
    pub color_quotes: usize,
    pub instruments: usize,
    pub failed_instruments: Vec<String>,
    pub consensus_file: PathBuf,
    pub consensus_sha256: String,
}

impl RunManifest {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}
