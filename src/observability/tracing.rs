use chrono::NaiveDate;
use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::loader::LogFormat;
use crate::error::{Error, Result};
use crate::types::ids::InstrumentId;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| Error::ConfigError(format!("invalid log level {:?}: {}", default_level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| Error::ConfigError(format!("tracing init failed: {}", e)))
}

pub fn trace_pricing_run(as_of: NaiveDate) -> Span {
    tracing::info_span!(
        "pricing_run",
        as_of = %as_of,
    )
}

pub fn trace_instrument(instrument_id: &InstrumentId) -> Span {
    tracing::debug_span!(
        "instrument_selection",
        instrument = %instrument_id,
    )
}
