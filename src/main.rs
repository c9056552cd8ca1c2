use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use loan_consensus::config::loader::AppConfig;
use loan_consensus::core::pricing_run::{PricingRun, RunOptions};
use loan_consensus::observability::metrics::{register_metrics, render_metrics};
use loan_consensus::observability::tracing::init_tracing;
use loan_consensus::persistence::csv_inputs::CsvInputs;
use loan_consensus::persistence::csv_sink::CsvResultSink;
use loan_consensus::utils::helper::run_clock;

/// Daily consensus bid/offer pricing for bank loans
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config overlay loaded on top of config/default.toml
    #[arg(long, default_value = "default")]
    env: String,

    /// Re-run pricing for an earlier date (YYYY-MM-DD)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Select instruments one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.env).context("loading configuration")?;
    init_tracing(config.runtime.log_format, &config.runtime.log_level)?;
    register_metrics()?;

    let options = RunOptions {
        clock: run_clock(args.as_of),
        parallel: config.runtime.parallel && !args.sequential,
        threads: config.runtime.threads,
    };
    let as_of = options.as_of();

    let sink = CsvResultSink::new(config.outputs.clone());
    let run = PricingRun::new(CsvInputs::new(config.inputs.clone()), sink, options);
    let summary = run.execute().await.context("pricing run failed")?;

    if config.outputs.write_metrics {
        let metrics_sink = CsvResultSink::new(config.outputs.clone());
        let path = metrics_sink.persist_metrics(as_of, &render_metrics()?).await?;
        info!("Metrics written to {:?}", path);
    }

    info!(
        run_id = %summary.run_id,
        quotes = summary.quotes,
        excluded_stale = summary.excluded_stale,
        instruments = summary.results.len(),
        failed = summary.failed_instruments.len(),
        consensus = ?summary.consensus.path,
        sha256 = %summary.consensus.sha256,
        "Done"
    );
    Ok(())
}
