//! Snapshot loading from a directory of JSON files.
//!
//! | File            | Required | Content                          |
//! |-----------------|----------|----------------------------------|
//! | `baseline.json` | yes      | budget pieces for one year       |
//! | `levers.json`   | yes      | lever catalog (array)            |
//! | `bridge.json`   | no       | COFOG/mission bridge (array)     |
//! | `series.json`   | yes      | GDP, deficit and debt by year    |

use std::path::Path;

use anyhow::Context;
use budgetsim_core::snapshot::{BaselineSeries, BudgetBaseline, CofogMissionBridge, LeverCatalog};
use budgetsim_core::Snapshot;
use serde::de::DeserializeOwned;

pub const BASELINE_FILE: &str = "baseline.json";
pub const LEVERS_FILE: &str = "levers.json";
pub const BRIDGE_FILE: &str = "bridge.json";
pub const SERIES_FILE: &str = "series.json";

/// Read every snapshot file under `dir` and build an immutable snapshot.
pub fn load_snapshot(dir: &Path) -> anyhow::Result<Snapshot> {
    let baseline: BudgetBaseline = read_json(&dir.join(BASELINE_FILE))?;
    let levers: LeverCatalog = read_json(&dir.join(LEVERS_FILE))?;
    let series: BaselineSeries = read_json(&dir.join(SERIES_FILE))?;

    let bridge_path = dir.join(BRIDGE_FILE);
    let bridge: CofogMissionBridge = if bridge_path.exists() {
        read_json(&bridge_path)?
    } else {
        tracing::debug!(path = %bridge_path.display(), "No bridge file; using an empty bridge");
        CofogMissionBridge::default()
    };

    tracing::info!(
        dir = %dir.display(),
        year = baseline.year,
        pieces = baseline.pieces.len(),
        levers = levers.levers.len(),
        bridge_entries = bridge.entries.len(),
        "Snapshot loaded",
    );

    Ok(Snapshot::new(baseline, levers, bridge, series))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}
