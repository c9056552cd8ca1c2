use std::collections::BTreeMap;
use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;
use crate::config::FactorConfig;
use crate::consensus::explain::ConsensusExplainer;
use crate::consensus::result::ConsensusResult;
use crate::consensus::selector::ConsensusSelector;
use crate::error::{Error, Result};
use crate::interfaces::input_source::InputSource;
use crate::interfaces::result_sink::{ExportedFile, ResultSink};
use crate::observability::metrics::{
    record_consensus, QUOTES_EXCLUDED_STALE, QUOTES_INGESTED, SELECTION_LATENCY,
};
use crate::observability::tracing::{trace_instrument, trace_pricing_run};
use crate::persistence::manifest::RunManifest;
use crate::staleness::tracker::StalenessTracker;
use crate::types::ids::InstrumentId;
use crate::utils::helper::generate_run_id;
use crate::weighting::model::WeightModel;
use crate::weighting::weighted_quote::WeightedQuote;

#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Wall clock of the run; its date is the as-of date
    pub clock: NaiveDateTime,
    pub parallel: bool,
    /// Size of a dedicated selection pool. `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl RunOptions {
    pub fn as_of(&self) -> NaiveDate {
        self.clock.date()
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    pub quotes: usize,
    pub excluded_stale: usize,
    pub color_quotes: usize,
    pub results: Vec<ConsensusResult>,
    pub failed_instruments: Vec<InstrumentId>,
    pub consensus: ExportedFile,
}

type Selection = (InstrumentId, Result<ConsensusResult>);

/// One day's pricing, from raw inputs to published files.
pub struct PricingRun<I: InputSource, S: ResultSink> {
    inputs: I,
    sink: S,
    options: RunOptions,
}

impl<I: InputSource, S: ResultSink> PricingRun<I, S> {
    pub fn new(inputs: I, sink: S, options: RunOptions) -> Self {
        PricingRun { inputs, sink, options }
    }

    pub async fn execute(&self) -> Result<RunSummary> {
        let as_of = self.options.as_of();
        self.run(as_of).instrument(trace_pricing_run(as_of)).await
    }

    async fn run(&self, as_of: NaiveDate) -> Result<RunSummary> {
        let run_id = generate_run_id();
        info!(%run_id, clock = %self.options.clock, "Starting pricing run");

        let (factors, hierarchy, prior, quotes) = tokio::try_join!(
            self.inputs.load_factors(),
            self.inputs.load_hierarchy(),
            self.inputs.load_prior_day(),
            self.inputs.load_quotes(),
        )?;
        info!(
            stale_threshold_days = factors.stale_threshold_days,
            time_decay_days = factors.time_decay_days,
            std_dev_tolerance = factors.std_dev_tolerance,
            "Factors loaded"
        );

        // Stage 1: staleness
        let records = StalenessTracker::new(&factors, as_of).track(quotes, &prior);
        let quote_count = records.len();
        let excluded_stale = records.iter().filter(|r| !r.is_included).count();
        let color_quotes = records.iter().filter(|r| r.is_color()).count();
        QUOTES_INGESTED.inc_by(quote_count as u64);
        QUOTES_EXCLUDED_STALE.inc_by(excluded_stale as u64);
        info!(quotes = quote_count, excluded_stale, color_quotes, "Staleness applied");

        tokio::try_join!(
            self.sink.persist_filtered(as_of, &records),
            self.sink.persist_counters(as_of, &records),
        )?;

        // Stage 2: weights
        let weighted = WeightModel::new(&hierarchy, factors, self.options.clock).weigh_all(records);
        let groups = group_by_instrument(weighted);

        // Stage 3: selection
        let parallel = self.options.parallel;
        let threads = self.options.threads;
        let timer = SELECTION_LATENCY.start_timer();
        let selections = tokio::task::spawn_blocking(move || select_groups(factors, groups, parallel, threads))
            .await
            .map_err(|e| Error::TaskFailed(e.to_string()))??;
        timer.observe_duration();

        let mut results = Vec::with_capacity(selections.len());
        let mut failed_instruments = Vec::new();
        for (instrument_id, outcome) in selections {
            match outcome {
                Ok(result) => {
                    record_consensus(&result);
                    debug!("{}", ConsensusExplainer::explain(&result));
                    results.push(result);
                }
                Err(e) => {
                    error!(instrument = %instrument_id, "Selection failed, instrument skipped: {}", e);
                    failed_instruments.push(instrument_id);
                }
            }
        }

        let consensus = self.sink.persist_consensus(as_of, &results).await?;

        let manifest = RunManifest {
            run_id,
            as_of,
            clock: self.options.clock,
            factors,
            quotes: quote_count,
            excluded_stale,
            color_quotes,
            instruments: results.len(),
            failed_instruments: failed_instruments.iter().map(|id| id.to_string()).collect(),
            consensus_file: consensus.path.clone(),
            consensus_sha256: consensus.sha256.clone(),
        };
        self.sink.persist_manifest(&manifest).await?;

        info!(
            instruments = results.len(),
            failed = failed_instruments.len(),
            "Pricing run complete"
        );

        Ok(RunSummary {
            run_id,
            as_of,
            quotes: quote_count,
            excluded_stale,
            color_quotes,
            results,
            failed_instruments,
            consensus,
        })
    }
}

/// Groups come out ordered by instrument id and are never empty.
pub fn group_by_instrument(quotes: Vec<WeightedQuote>) -> Vec<(InstrumentId, Vec<WeightedQuote>)> {
    let mut groups: BTreeMap<InstrumentId, Vec<WeightedQuote>> = BTreeMap::new();
    for quote in quotes {
        groups.entry(quote.instrument_id().clone()).or_default().push(quote);
    }
    groups.into_iter().collect()
}

fn select_groups(
    factors: FactorConfig,
    groups: Vec<(InstrumentId, Vec<WeightedQuote>)>,
    parallel: bool,
    threads: Option<usize>,
) -> Result<Vec<Selection>> {
    let selector = ConsensusSelector::new(factors);
    let select_one = |(instrument_id, quotes): (InstrumentId, Vec<WeightedQuote>)| {
        let _span = trace_instrument(&instrument_id).entered();
        let outcome = selector.select(&instrument_id, quotes);
        (instrument_id, outcome)
    };

    if !parallel || threads.is_some_and(|n| n <= 1) {
        return Ok(groups.into_iter().map(select_one).collect());
    }

    match threads {
        Some(n) => {
            let pool = ThreadPoolBuilder::new()
                .num_threads(n)
                .thread_name(|i| format!("selection-{}", i))
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?;
            Ok(pool.install(|| groups.into_par_iter().map(select_one).collect()))
        }
        None => Ok(groups.into_par_iter().map(select_one).collect()),
    }
}
