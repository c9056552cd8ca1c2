use std::path::Path;
use csv::ReaderBuilder;
use tracing::{info, warn};
use crate::config::{FactorConfig, FactorOverrides};
use crate::error::{Error, Result};

const STALE_LABEL: &str = "Stale";
const TIME_DECAY_LABEL: &str = "Time";
const TOLERANCE_LABEL: &str = "Standard";

/// Parse a header-less `label,value` factor sheet.
///
/// Labels are matched by substring so that "Stale Days", "Time Decay" and
/// "Standard Deviations" all resolve. Later rows win. Blank values keep the
/// default; values that are not numbers are logged and ignored.
pub fn parse_factor_csv(data: &[u8]) -> Result<FactorOverrides> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut overrides = FactorOverrides::default();

    for record in reader.records() {
        let record = record?;
        let label = match record.get(0) {
            Some(label) => label,
            None => continue,
        };
        let raw_value = match record.get(1) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };
        let value = match raw_value.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring factor {:?}: value {:?} is not numeric", label, raw_value);
                continue;
            }
        };

        if label.contains(TIME_DECAY_LABEL) {
            overrides.time_decay_days = Some(value);
        }
        if label.contains(TOLERANCE_LABEL) {
            overrides.std_dev_tolerance = Some(value);
        }
        if label.contains(STALE_LABEL) {
            overrides.stale_threshold_days = Some(value);
        }
    }

    Ok(overrides)
}

/// Load the factor sheet. The sheet itself must exist: a missing file means
/// a broken deployment, not a data-quality problem.
pub async fn load_factor_file(path: &Path) -> Result<FactorConfig> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingFactorSource { path: path.to_path_buf() });
        }
        Err(e) => return Err(Error::IoError(e)),
    };

    let overrides = parse_factor_csv(&data)?;
    let factors = FactorConfig::from_overrides(overrides)?;
    info!(
        stale_threshold_days = factors.stale_threshold_days,
        time_decay_days = factors.time_decay_days,
        std_dev_tolerance = factors.std_dev_tolerance,
        "Loaded pricing factors from {:?}",
        path
    );
    Ok(factors)
}
