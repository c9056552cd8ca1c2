use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use crate::config::loader::OutputConfig;
use crate::consensus::result::ConsensusResult;
use crate::error::{Error, Result};
use crate::interfaces::result_sink::{ExportedFile, ResultSink};
use crate::persistence::format::{format_price, format_significant};
use crate::persistence::manifest::RunManifest;
use crate::staleness::prior_day::effective_counters;
use crate::types::quote::QuoteRecord;
use crate::types::timestamp::format_quote_timestamp;
use crate::utils::helper::{file_date_label, sha256_hex};

/// Weight components are published to five significant figures
const WEIGHT_DIGITS: usize = 5;

#[derive(Debug, Serialize)]
struct FilterRow<'a> {
    key: String,
    lin: &'a str,
    dealer: &'a str,
    last_bid: f64,
    last_offer: f64,
    last_bid_date: String,
    unchanged_for: Option<u32>,
    days_stale: Option<u32>,
    included: u8,
    color: u8,
}

impl<'a> FilterRow<'a> {
    fn from_record(record: &'a QuoteRecord) -> Self {
        FilterRow {
            key: record.key().map(|k| k.0).unwrap_or_default(),
            lin: record.instrument_id.as_str(),
            dealer: record.dealer_id().map(|d| d.as_str()).unwrap_or_default(),
            last_bid: record.bid,
            last_offer: record.offer,
            last_bid_date: record.quote_timestamp.as_ref().map(format_quote_timestamp).unwrap_or_default(),
            unchanged_for: record.unchanged_for,
            days_stale: record.days_stale,
            included: u8::from(record.is_included),
            color: u8::from(record.is_color()),
        }
    }
}

/// Same layout the prior-day loader reads. Pairs without history are
/// written with their defaulted counters so they start ageing tomorrow.
#[derive(Debug, Serialize)]
struct CounterRow {
    #[serde(rename = "Concatenated")]
    key: String,
    unchanged_for: u32,
    days_stale: u32,
}

impl CounterRow {
    fn from_record(record: &QuoteRecord) -> Option<Self> {
        let key = record.key()?;
        let (unchanged_for, days_stale) = effective_counters(record.unchanged_for, record.days_stale);
        Some(CounterRow { key: key.0, unchanged_for, days_stale })
    }
}

#[derive(Debug, Serialize)]
struct ConsensusRow<'a> {
    lin: &'a str,
    dealer: &'a str,
    last_bid: f64,
    last_offer: f64,
    last_bid_date: String,
    unchanged_for: u32,
    days_stale: u32,
    included: u8,
    color: u8,
    dealer_weight: String,
    recency_weight: String,
    stale_weight: String,
    weight: String,
    std_dev: f64,
    midpoint: String,
    calculated_bid: String,
    calculated_offer: String,
    selected: u8,
    path: &'static str,
}

fn consensus_rows(result: &ConsensusResult) -> impl Iterator<Item = ConsensusRow<'_>> {
    result.quotes.iter().map(move |quote| ConsensusRow {
        lin: result.instrument_id.as_str(),
        dealer: quote.record.dealer_id().map(|d| d.as_str()).unwrap_or_default(),
        last_bid: quote.bid(),
        last_offer: quote.offer,
        last_bid_date: quote.record.quote_timestamp.as_ref().map(format_quote_timestamp).unwrap_or_default(),
        unchanged_for: quote.unchanged_for,
        days_stale: quote.days_stale,
        included: u8::from(quote.is_included()),
        color: u8::from(quote.is_color()),
        dealer_weight: format_significant(quote.weights.dealer, WEIGHT_DIGITS),
        recency_weight: format_significant(quote.weights.recency, WEIGHT_DIGITS),
        stale_weight: format_significant(quote.weights.stale, WEIGHT_DIGITS),
        weight: format_significant(quote.weights.final_weight, WEIGHT_DIGITS),
        std_dev: result.std_dev_used,
        midpoint: format_price(result.midpoint),
        calculated_bid: format_price(result.calculated_bid),
        calculated_offer: format_price(result.calculated_offer),
        selected: u8::from(quote.is_selected),
        path: result.path.label(),
    })
}

fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<(Vec<u8>, usize)> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    let data = writer.into_inner()
        .map_err(|e| Error::SerializationError(e.to_string()))?;
    Ok((data, count))
}

/// Writes the day's exports into the results directory.
pub struct CsvResultSink {
    config: OutputConfig,
}

impl CsvResultSink {
    pub fn new(config: OutputConfig) -> Self {
        CsvResultSink { config }
    }

    pub fn path_for(&self, stem: &str, as_of: NaiveDate, extension: &str) -> PathBuf {
        self.config.dir.join(format!("{}_{}.{}", stem, file_date_label(as_of), extension))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.dir).await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    /// Prometheus text dump of the run's metrics
    pub async fn persist_metrics(&self, as_of: NaiveDate, metrics: &str) -> Result<PathBuf> {
        let path = self.path_for("metrics", as_of, "prom");
        self.write(&path, metrics.as_bytes()).await?;
        Ok(path)
    }
}

#[async_trait]
impl ResultSink for CsvResultSink {
    async fn persist_filtered(&self, as_of: NaiveDate, records: &[QuoteRecord]) -> Result<()> {
        if !self.config.write_filter_file {
            return Ok(());
        }
        let (data, rows) = to_csv(records.iter().map(FilterRow::from_record))?;
        let path = self.path_for("filter", as_of, "csv");
        self.write(&path, &data).await?;
        info!("Filter file with {} rows written to {:?}", rows, path);
        Ok(())
    }

    async fn persist_counters(&self, as_of: NaiveDate, records: &[QuoteRecord]) -> Result<()> {
        if !self.config.write_counters {
            return Ok(());
        }
        let (data, count) = to_csv(records.iter().filter_map(CounterRow::from_record))?;
        let path = self.path_for("daily_state", as_of, "csv");
        self.write(&path, &data).await?;
        info!("Counters for {} quotes written to {:?}", count, path);
        Ok(())
    }

    async fn persist_consensus(&self, as_of: NaiveDate, results: &[ConsensusResult]) -> Result<ExportedFile> {
        let (data, rows) = to_csv(results.iter().flat_map(consensus_rows))?;
        let path = self.path_for("consensus", as_of, "csv");
        self.write(&path, &data).await?;
        info!("Consensus for {} instruments ({} quote rows) written to {:?}", results.len(), rows, path);

        Ok(ExportedFile {
            sha256: sha256_hex(&data),
            path,
            rows,
        })
    }

    async fn persist_manifest(&self, manifest: &RunManifest) -> Result<()> {
        if !self.config.write_manifest {
            return Ok(());
        }
        let data = manifest.to_json()
            .map_err(|e| Error::SerializationError(e.to_string()))?;
        let path = self.path_for("manifest", manifest.as_of, "json");
        self.write(&path, &data).await
    }
}
