use std::path::PathBuf;

use anyhow::Context;
use budgetsim_core::{EngineConfig, MacroParams};

/// Default directory holding the snapshot files.
pub const DEFAULT_SNAPSHOT_DIR: &str = "./data/snapshot";

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Directory with `baseline.json`, `levers.json`, `bridge.json` and
    /// `series.json`.
    pub snapshot_dir: PathBuf,
    /// Optional JSON file overriding macro feedback parameters.
    pub macro_params_path: Option<PathBuf>,
    /// Optional override of the net expenditure reference growth rate.
    pub net_expenditure_reference_rate: Option<f64>,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default            |
    /// |----------------------------------|--------------------|
    /// | `SNAPSHOT_DIR`                   | `./data/snapshot`  |
    /// | `MACRO_PARAMS_PATH`              | built-in IRFs      |
    /// | `NET_EXPENDITURE_REFERENCE_RATE` | `0.015`            |
    /// | `LOG_FORMAT`                     | `text`             |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let snapshot_dir: PathBuf = lookup("SNAPSHOT_DIR")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.into())
            .into();

        let macro_params_path = lookup("MACRO_PARAMS_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let net_expenditure_reference_rate = lookup("NET_EXPENDITURE_REFERENCE_RATE")
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .with_context(|| format!("NET_EXPENDITURE_REFERENCE_RATE must be a number, got {raw:?}"))
            })
            .transpose()?;

        let log_json = lookup("LOG_FORMAT")
            .map(|f| f.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            snapshot_dir,
            macro_params_path,
            net_expenditure_reference_rate,
            log_json,
        })
    }

    /// Build the engine configuration, reading the macro parameter file if
    /// one is configured.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::default();
        if let Some(path) = &self.macro_params_path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read macro params at {}", path.display()))?;
            config.macro_params = MacroParams::from_json(&text)
                .with_context(|| format!("Invalid macro params at {}", path.display()))?;
        }
        if let Some(rate) = self.net_expenditure_reference_rate {
            config.net_expenditure_reference_rate = rate;
        }
        Ok(config)
    }
}
