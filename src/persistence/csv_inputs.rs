use std::path::{Path, PathBuf};
use std::time::SystemTime;
use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{info, warn};
use crate::config::FactorConfig;
use crate::config::factors::load_factor_file;
use crate::config::loader::InputPaths;
use crate::error::{Error, Result};
use crate::interfaces::input_source::InputSource;
use crate::staleness::prior_day::{PriorCounters, PriorDayState};
use crate::types::ids::{DealerId, QuoteKey};
use crate::types::quote::RawQuote;
use crate::types::timestamp::parse_quote_timestamp;
use crate::weighting::hierarchy::DealerHierarchy;

/// One row of the quote feed. Other feed columns are ignored.
#[derive(Debug, Deserialize)]
struct QuoteRow {
    lin: String,
    dealer: Option<String>,
    last_bid: f64,
    last_offer: Option<f64>,
    last_bid_date: Option<String>,
}

impl QuoteRow {
    fn into_raw(self) -> Option<RawQuote> {
        let lin = self.lin.trim();
        if lin.is_empty() || !self.last_bid.is_finite() {
            return None;
        }

        let quote_timestamp = self.last_bid_date.as_deref().and_then(parse_quote_timestamp);
        let dealer = self.dealer.as_deref().map(str::trim).filter(|d| !d.is_empty());

        Some(match dealer {
            Some(dealer) => {
                let offer = self.last_offer.filter(|o| o.is_finite()).unwrap_or(self.last_bid);
                RawQuote::firm(lin, dealer, self.last_bid, offer, quote_timestamp)
            }
            None => RawQuote::color(lin, self.last_bid, quote_timestamp),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CounterRow {
    #[serde(rename = "Concatenated")]
    key: String,
    unchanged_for: Option<f64>,
    days_stale: Option<f64>,
}

/// Counters come back from the database as floats and sometimes as NaN.
fn counter_value(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u32)
}

pub fn parse_quotes(data: &[u8]) -> Result<Vec<RawQuote>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(data);
    let mut quotes = Vec::new();

    for (idx, row) in reader.deserialize::<QuoteRow>().enumerate() {
        match row {
            Ok(row) => match row.into_raw() {
                Some(quote) => quotes.push(quote),
                None => warn!(row = idx + 1, "Skipping quote without instrument or bid"),
            },
            Err(e) => warn!(row = idx + 1, "Skipping unreadable quote row: {}", e),
        }
    }

    Ok(quotes)
}

pub fn parse_prior_day(data: &[u8]) -> Result<PriorDayState> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(data);
    let mut state = PriorDayState::new();

    for (idx, row) in reader.deserialize::<CounterRow>().enumerate() {
        match row {
            Ok(row) if !row.key.is_empty() => state.insert(
                QuoteKey::from_raw(row.key),
                PriorCounters {
                    unchanged_for: counter_value(row.unchanged_for),
                    days_stale: counter_value(row.days_stale),
                },
            ),
            Ok(_) => {}
            Err(e) => warn!(row = idx + 1, "Skipping unreadable counter row: {}", e),
        }
    }

    Ok(state)
}

/// Dealer in the first column, rank in the second, whatever the headers say.
pub fn parse_hierarchy(data: &[u8]) -> Result<DealerHierarchy> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);
    let mut hierarchy = DealerHierarchy::new();

    for record in reader.records() {
        let record = record?;
        let (Some(dealer), Some(rank)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if dealer.is_empty() {
            continue;
        }
        match rank.parse::<f64>() {
            Ok(rank) if rank.is_finite() && rank >= 1.0 => {
                hierarchy.insert(DealerId::new(dealer), rank.round() as u32);
            }
            _ => warn!(dealer, rank, "Skipping dealer with invalid rank"),
        }
    }

    Ok(hierarchy)
}

/// Most recently modified `<prefix>*.csv` in `dir`.
pub async fn latest_matching(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut latest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(prefix) || !name.ends_with(".csv") {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if latest.as_ref().is_none_or(|(newest, _)| modified > *newest) {
            latest = Some((modified, entry.path()));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| Error::NoInputFile {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
}

/// Reads the day's inputs from the shared drop directories.
pub struct CsvInputs {
    paths: InputPaths,
}

impl CsvInputs {
    pub fn new(paths: InputPaths) -> Self {
        CsvInputs { paths }
    }
}

#[async_trait]
impl InputSource for CsvInputs {
    async fn load_factors(&self) -> Result<FactorConfig> {
        load_factor_file(&self.paths.factor_file).await
    }

    async fn load_hierarchy(&self) -> Result<DealerHierarchy> {
        let data = tokio::fs::read(&self.paths.hierarchy_file).await?;
        let hierarchy = parse_hierarchy(&data)?;
        info!("Loaded {} ranked dealers from {:?}", hierarchy.len(), self.paths.hierarchy_file);
        Ok(hierarchy)
    }

    async fn load_prior_day(&self) -> Result<PriorDayState> {
        let data = tokio::fs::read(&self.paths.prior_day_file).await?;
        let state = parse_prior_day(&data)?;
        info!("Loaded {} prior-day counters from {:?}", state.len(), self.paths.prior_day_file);
        Ok(state)
    }

    async fn load_quotes(&self) -> Result<Vec<RawQuote>> {
        let path = latest_matching(&self.paths.quote_dir, &self.paths.quote_prefix).await?;
        let data = tokio::fs::read(&path).await?;
        let quotes = parse_quotes(&data)?;
        info!("Loaded {} quotes from {:?}", quotes.len(), path);
        Ok(quotes)
    }
}
