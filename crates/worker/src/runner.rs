//! Run loop: blobs in, result documents out.

use std::io::{BufRead, Write};
use std::path::Path;

use budgetsim_core::{simulate_blob, CoreError, EngineConfig, Snapshot, SnapshotStore};
use serde::Serialize;

use crate::loader::load_snapshot;

/// Input line that reloads the snapshot instead of running a scenario.
pub const RELOAD_COMMAND: &str = ":reload";

/// Error document printed in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&CoreError> for ErrorBody {
    fn from(err: &CoreError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl ErrorBody {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decode and simulate one blob, returning the serialized result.
pub fn run(
    blob: &str,
    snapshot: &Snapshot,
    config: &EngineConfig,
    pretty: bool,
) -> Result<String, ErrorBody> {
    let result = simulate_blob(blob, snapshot, config).map_err(|e| {
        tracing::warn!(kind = e.kind(), error = %e, "Scenario rejected");
        ErrorBody::from(&e)
    })?;

    let text = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    text.map_err(|e| ErrorBody {
        kind: "SerializationError",
        message: e.to_string(),
    })
}

/// Process one blob per input line until EOF, writing one JSON document
/// per output line. A [`RELOAD_COMMAND`] line swaps in a freshly loaded
/// snapshot; scenarios already read keep the snapshot they started with.
///
/// Returns the number of scenarios that failed.
pub fn run_stream(
    input: impl BufRead,
    mut output: impl Write,
    store: &SnapshotStore,
    snapshot_dir: &Path,
    config: &EngineConfig,
) -> anyhow::Result<usize> {
    let mut failures = 0;
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == RELOAD_COMMAND {
            match load_snapshot(snapshot_dir) {
                Ok(next) => {
                    store.swap(next);
                }
                Err(e) => tracing::error!(error = %e, "Snapshot reload failed; keeping current"),
            }
            continue;
        }

        let snapshot = store.current();
        let body = match run(line, &snapshot, config, false) {
            Ok(text) => text,
            Err(err) => {
                failures += 1;
                err.to_json()?
            }
        };
        writeln!(output, "{body}")?;
    }
    output.flush()?;
    Ok(failures)
}
