//! `budgetsim-worker` -- runs scenario blobs against a snapshot on disk.
//!
//! With a blob as the first argument, prints the pretty-printed result and
//! exits non-zero if the scenario is rejected. Without arguments, reads one
//! blob per stdin line and writes one JSON document per stdout line.
//!
//! # Environment variables
//!
//! | Variable                         | Required | Default           | Description                      |
//! |----------------------------------|----------|-------------------|----------------------------------|
//! | `SNAPSHOT_DIR`                   | no       | `./data/snapshot` | Directory with the snapshot JSON |
//! | `MACRO_PARAMS_PATH`              | no       | --                | Macro parameter override file    |
//! | `NET_EXPENDITURE_REFERENCE_RATE` | no       | `0.015`           | Expenditure rule reference rate  |
//! | `LOG_FORMAT`                     | no       | `text`            | `json` for JSON log lines        |
//! | `RUST_LOG`                       | no       | `budgetsim_worker=info,budgetsim_core=info` | Log filter |

use std::process::ExitCode;

use anyhow::Context;
use budgetsim_core::SnapshotStore;
use budgetsim_worker::config::WorkerConfig;
use budgetsim_worker::loader::load_snapshot;
use budgetsim_worker::runner;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "budgetsim_worker=info,budgetsim_core=info";

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr; stdout carries result documents only.
    let json_logs = config.log_json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    match serve(&config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Worker failed");
            ExitCode::FAILURE
        }
    }
}

fn serve(config: &WorkerConfig) -> anyhow::Result<ExitCode> {
    let engine_config = config.engine_config()?;
    let snapshot = load_snapshot(&config.snapshot_dir)
        .with_context(|| format!("Failed to load snapshot from {}", config.snapshot_dir.display()))?;

    tracing::info!(
        snapshot_dir = %config.snapshot_dir.display(),
        baseline_year = snapshot.baseline.year,
        "Starting budgetsim-worker",
    );

    if let Some(blob) = std::env::args().nth(1) {
        return Ok(match runner::run(&blob, &snapshot, &engine_config, true) {
            Ok(result) => {
                println!("{result}");
                ExitCode::SUCCESS
            }
            Err(body) => {
                println!("{}", body.to_json()?);
                ExitCode::FAILURE
            }
        });
    }

    let store = SnapshotStore::new(snapshot);
    let stdin = std::io::stdin();
    let failures = runner::run_stream(
        stdin.lock(),
        std::io::stdout().lock(),
        &store,
        &config.snapshot_dir,
        &engine_config,
    )?;
    tracing::info!(failures, "Input exhausted");
    Ok(ExitCode::SUCCESS)
}
