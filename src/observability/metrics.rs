use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder,
};
use crate::consensus::result::{ConsensusResult, MidpointSource, SelectionPath};
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Quote metrics
    pub static ref QUOTES_INGESTED: IntCounter = IntCounter::new(
        "quotes_ingested_total",
        "Total number of quotes read from the feed"
    ).expect("valid metric definition");

    pub static ref QUOTES_EXCLUDED_STALE: IntCounter = IntCounter::new(
        "quotes_excluded_stale_total",
        "Quotes excluded for exceeding the stale threshold"
    ).expect("valid metric definition");

    // Selection metrics
    pub static ref INSTRUMENTS_PRICED: IntCounter = IntCounter::new(
        "instruments_priced_total",
        "Instruments with a consensus price"
    ).expect("valid metric definition");

    pub static ref COLOR_MIDPOINTS: IntCounter = IntCounter::new(
        "color_midpoints_total",
        "Instruments whose midpoint came from color quotes"
    ).expect("valid metric definition");

    pub static ref DEPTH_RESCUES: IntCounter = IntCounter::new(
        "depth_rescues_total",
        "Selections widened to admit excluded quotes"
    ).expect("valid metric definition");

    pub static ref STALE_FALLBACKS: IntCounter = IntCounter::new(
        "stale_fallbacks_total",
        "Instruments priced with every quote stale"
    ).expect("valid metric definition");

    pub static ref EMPTY_SELECTIONS: IntCounter = IntCounter::new(
        "empty_selections_total",
        "Selections that matched no quote and fell back to the heaviest"
    ).expect("valid metric definition");

    // Latency metrics
    pub static ref SELECTION_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "selection_latency_seconds",
            "Consensus selection latency across all instruments"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
    ).expect("valid metric definition");
}

pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(QUOTES_INGESTED.clone()),
        Box::new(QUOTES_EXCLUDED_STALE.clone()),
        Box::new(INSTRUMENTS_PRICED.clone()),
        Box::new(COLOR_MIDPOINTS.clone()),
        Box::new(DEPTH_RESCUES.clone()),
        Box::new(STALE_FALLBACKS.clone()),
        Box::new(EMPTY_SELECTIONS.clone()),
        Box::new(SELECTION_LATENCY.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(Error::MetricsError(e.to_string())),
        }
    }
    Ok(())
}

/// Count the path an instrument took through selection.
pub fn record_consensus(result: &ConsensusResult) {
    INSTRUMENTS_PRICED.inc();

    if matches!(result.midpoint_source, MidpointSource::Color { .. }) {
        COLOR_MIDPOINTS.inc();
    }

    match result.path {
        SelectionPath::Robust { depth_rescued: true } => DEPTH_RESCUES.inc(),
        SelectionPath::StaleAnchored | SelectionPath::BestStale => STALE_FALLBACKS.inc(),
        SelectionPath::EmptySelectionFallback => EMPTY_SELECTIONS.inc(),
        SelectionPath::Singleton | SelectionPath::Robust { depth_rescued: false } => {}
    }
}

/// Prometheus text exposition of everything registered.
pub fn render_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::MetricsError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| Error::MetricsError(e.to_string()))
}
