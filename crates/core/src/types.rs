use serde::Serialize;

use crate::accounting::Accounting;
use crate::compliance::Compliance;
use crate::macro_feedback::MacroOutcome;
use crate::resolution::Resolution;
use crate::warnings::EngineWarning;

/// Calendar year, e.g. `2026`.
pub type Year = i32;

/// Amount in euros. Deltas are signed in deficit terms: positive worsens.
pub type Eur = f64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Full outcome of one scenario computation.
///
/// Plain data only; no engine-internal types appear here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    #[serde(rename = "scenarioId")]
    pub scenario_id: String,
    pub years: Vec<Year>,
    pub accounting: Accounting,
    pub compliance: Compliance,
    #[serde(rename = "macro")]
    pub macro_outcome: MacroOutcome,
    pub resolution: Resolution,
    pub warnings: Vec<EngineWarning>,
}
