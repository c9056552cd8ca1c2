//! End-to-end pricing over files on disk.

use std::path::Path;
use chrono::NaiveDate;
use loan_consensus::config::loader::AppConfig;
use loan_consensus::consensus::result::SelectionPath;
use loan_consensus::core::pricing_run::{PricingRun, RunOptions, RunSummary};
use loan_consensus::persistence::csv_inputs::{parse_prior_day, CsvInputs};
use loan_consensus::persistence::csv_sink::CsvResultSink;
use loan_consensus::types::ids::QuoteKey;
use loan_consensus::utils::helper::sha256_hex;

const QUOTES: &str = "\
lin,dealer,last_bid,last_offer,last_bid_date
LX1,GS,98.0,99.0,2026-10-16 10:00:00
LX1,MS,98.5,99.5,2026-10-15 10:00:00
LX1,JPM,97.0,98.0,
LX2,GS,90.0,91.0,2026-10-16 09:00:00
LX3,BAML,85.0,86.0,
LX3,CITI,86.0,87.0,
";

const PRIOR_DAY: &str = "\
Concatenated,unchanged_for,days_stale
LX1_MS,4,3
LX1_JPM,20,15
LX3_BAML,12,11
LX3_CITI,5,14
";

const HIERARCHY: &str = "Dealer,Rank\nGS,1\nMS,2\nBAML,3\n";

const FACTORS: &str = "Stale Days,10\nTime Decay,30\nStandard Deviations,1.28\n";

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

fn write_inputs(root: &Path, prior_day: &str) {
    std::fs::create_dir_all(root.join("trovo")).unwrap();
    std::fs::write(root.join("trovo/mw-set-20261016.csv"), QUOTES).unwrap();
    std::fs::write(root.join("prior.csv"), prior_day).unwrap();
    std::fs::write(root.join("hierarchy.csv"), HIERARCHY).unwrap();
    std::fs::write(root.join("factors.csv"), FACTORS).unwrap();
}

fn config(root: &Path) -> AppConfig {
    AppConfig::from_toml_str(&format!(
        r#"
[inputs]
quote_dir = "{root}/trovo"
prior_day_file = "{root}/prior.csv"
hierarchy_file = "{root}/hierarchy.csv"
factor_file = "{root}/factors.csv"

[outputs]
dir = "{root}/results"
"#,
        root = root.display()
    ))
    .unwrap()
}

async fn run(config: &AppConfig, parallel: bool) -> RunSummary {
    let options = RunOptions {
        clock: as_of().and_hms_opt(15, 0, 0).unwrap(),
        parallel,
        threads: None,
    };
    PricingRun::new(
        CsvInputs::new(config.inputs.clone()),
        CsvResultSink::new(config.outputs.clone()),
        options,
    )
    .execute()
    .await
    .unwrap()
}

#[tokio::test]
async fn prices_a_day_and_writes_every_export() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), PRIOR_DAY);
    let config = config(dir.path());

    let summary = run(&config, true).await;

    assert_eq!(summary.quotes, 6);
    assert_eq!(summary.excluded_stale, 3);
    assert!(summary.failed_instruments.is_empty());

    let by_id = |id: &str| summary.results.iter().find(|r| r.instrument_id.as_str() == id).unwrap();

    let lx1 = by_id("LX1");
    assert_eq!(lx1.path, SelectionPath::Robust { depth_rescued: false });
    assert_eq!(lx1.midpoint, 98.0);
    assert_eq!(lx1.calculated_bid, 98.0);
    assert_eq!(lx1.calculated_offer, 99.0);

    let lx2 = by_id("LX2");
    assert_eq!(lx2.path, SelectionPath::Singleton);
    assert_eq!(lx2.calculated_bid, 90.0);

    // Both LX3 quotes are stale; the ranked dealer carries more weight
    let lx3 = by_id("LX3");
    assert_eq!(lx3.path, SelectionPath::BestStale);
    assert_eq!(lx3.calculated_bid, 85.0);
    assert_eq!(lx3.calculated_offer, 86.0);

    let results = dir.path().join("results");
    for name in ["filter_10-16-2026.csv", "daily_state_10-16-2026.csv", "manifest_10-16-2026.json"] {
        assert!(results.join(name).exists(), "missing {}", name);
    }

    let consensus = std::fs::read(&summary.consensus.path).unwrap();
    assert_eq!(summary.consensus.sha256, sha256_hex(&consensus));
    assert_eq!(summary.consensus.rows, 6);

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(results.join("manifest_10-16-2026.json")).unwrap()).unwrap();
    assert_eq!(manifest["consensus_sha256"], summary.consensus.sha256.as_str());
    assert_eq!(manifest["instruments"], 3);
    assert_eq!(manifest["excluded_stale"], 3);
}

#[tokio::test]
async fn counters_roll_forward_into_next_day_format() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), PRIOR_DAY);
    let config = config(dir.path());

    run(&config, false).await;

    let written = std::fs::read(dir.path().join("results/daily_state_10-16-2026.csv")).unwrap();
    let state = parse_prior_day(&written).unwrap();
    assert_eq!(state.len(), 6);

    let ms = state.get(&QuoteKey::from_raw("LX1_MS")).unwrap();
    assert_eq!(ms.unchanged_for, Some(5));
    assert_eq!(ms.days_stale, Some(4));

    // Updated today without history: continuity starts at 1 so it can age
    let gs = state.get(&QuoteKey::from_raw("LX1_GS")).unwrap();
    assert_eq!(gs.unchanged_for, Some(1));
    assert_eq!(gs.days_stale, Some(0));

    // Not updated today: staleness keeps counting from yesterday's value
    let jpm = state.get(&QuoteKey::from_raw("LX1_JPM")).unwrap();
    assert_eq!(jpm.days_stale, Some(16));
}

#[tokio::test]
async fn parallel_and_sequential_runs_publish_identical_files() {
    let parallel_dir = tempfile::tempdir().unwrap();
    let sequential_dir = tempfile::tempdir().unwrap();
    write_inputs(parallel_dir.path(), PRIOR_DAY);
    write_inputs(sequential_dir.path(), PRIOR_DAY);

    let parallel = run(&config(parallel_dir.path()), true).await;
    let sequential = run(&config(sequential_dir.path()), false).await;

    assert_eq!(parallel.consensus.sha256, sequential.consensus.sha256);
}

#[tokio::test]
async fn missing_factor_sheet_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), PRIOR_DAY);
    std::fs::remove_file(dir.path().join("factors.csv")).unwrap();
    let config = config(dir.path());

    let options = RunOptions {
        clock: as_of().and_hms_opt(15, 0, 0).unwrap(),
        parallel: true,
        threads: None,
    };
    let err = PricingRun::new(
        CsvInputs::new(config.inputs.clone()),
        CsvResultSink::new(config.outputs.clone()),
        options,
    )
    .execute()
    .await
    .unwrap_err();

    assert!(matches!(err, loan_consensus::error::Error::MissingFactorSource { .. }));
    assert!(!dir.path().join("results").exists());
}
