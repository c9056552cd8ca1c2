use std::path::PathBuf;
use async_trait::async_trait;
use chrono::NaiveDate;
use crate::consensus::result::ConsensusResult;
use crate::error::Result;
use crate::persistence::manifest::RunManifest;
use crate::types::quote::QuoteRecord;

/// Location and digest of a written export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub sha256: String,
    pub rows: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Tracked quotes before weighting, for audit
    async fn persist_filtered(&self, as_of: NaiveDate, records: &[QuoteRecord]) -> Result<()>;
    /// Today's counters in the layout the next run reads back as prior-day state
    async fn persist_counters(&self, as_of: NaiveDate, records: &[QuoteRecord]) -> Result<()>;
    async fn persist_consensus(&self, as_of: NaiveDate, results: &[ConsensusResult]) -> Result<ExportedFile>;
    async fn persist_manifest(&self, manifest: &RunManifest) -> Result<()>;
}
