//! Scenario document types and decoding.
//!
//! A scenario arrives as an opaque blob (base64 of UTF-8 JSON). Decoding
//! runs in three passes and reports every violation it finds before
//! failing: raw-JSON schema rules, typed deserialization plus `validator`
//! range checks, then cross-field semantic checks.

pub mod schema;
pub mod target;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{CoreError, Violation};
use crate::types::Year;

/// Longest projection horizon a document may request.
pub const MAX_HORIZON_YEARS: u32 = 30;

/// Horizon used when `assumptions.horizon_years` is omitted.
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

/// Accepted range of `baseline_year`.
pub const MIN_BASELINE_YEAR: Year = 1900;
pub const MAX_BASELINE_YEAR: Year = 2200;

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// Document format version. Producers emit either `"0.1"` or `0.1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentVersion {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub version: DocumentVersion,
    pub baseline_year: Year,
    #[serde(default)]
    pub assumptions: Assumptions,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub offsets: Vec<Offset>,
}

impl ScenarioDocument {
    /// Calendar years covered by the projection, in order.
    pub fn years(&self) -> Vec<Year> {
        (0..self.assumptions.horizon_years as Year)
            .map(|i| self.baseline_year.saturating_add(i))
            .collect()
    }

    pub fn horizon(&self) -> usize {
        self.assumptions.horizon_years as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Assumptions {
    #[serde(default = "default_horizon")]
    #[validate(range(min = 1, max = 30))]
    pub horizon_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apu_subsector: Option<ApuSubsector>,
    #[serde(default)]
    pub lens: Lens,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            horizon_years: DEFAULT_HORIZON_YEARS,
            apu_subsector: None,
            lens: Lens::default(),
        }
    }
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_YEARS
}

/// Public-administration subsector whose local-balance rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApuSubsector {
    /// Central state: balance is checked cumulatively over the horizon.
    Apuc,
    /// Local government: every year must balance on its own.
    Apul,
    /// Social-security bodies: every year must balance on its own.
    Asso,
}

/// Axis along which masses are aggregated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lens {
    /// Government missions.
    #[default]
    Admin,
    /// COFOG functional categories.
    Cofog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Increase,
    Decrease,
    Activate,
    Apply,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A scheduled change that moves the deficit.
    #[default]
    Specified,
    /// A planning goal; diagnostic only.
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub target: String,
    pub op: Op,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_eur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_bps: Option<f64>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub role: Role,
    /// Calendar year of a one-off, or first year of a recurring action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
}

impl Action {
    /// Number of magnitude fields set on this action.
    pub fn magnitude_count(&self) -> usize {
        [
            self.amount_eur.is_some(),
            self.delta_pct.is_some(),
            self.delta_bps.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Spending,
    Revenue,
}

/// A counter-measure against the aggregate deficit, not tied to a piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub id: String,
    pub pool: Pool,
    pub amount_eur: f64,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a base64 blob carrying a JSON scenario document.
pub fn decode_scenario_blob(blob: &str) -> Result<ScenarioDocument, CoreError> {
    let bytes = STANDARD
        .decode(blob.trim())
        .map_err(|e| CoreError::validation("$", format!("Invalid base64 payload: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| CoreError::validation("$", format!("Payload is not UTF-8: {e}")))?;
    decode_scenario_json(&text)
}

/// Encode a document the way callers ship it: base64 of compact JSON.
pub fn encode_scenario_blob(document: &ScenarioDocument) -> String {
    // Serializing plain data structs with string keys cannot fail.
    let json = serde_json::to_string(document).unwrap_or_default();
    STANDARD.encode(json)
}

/// Decode and validate a JSON scenario document.
pub fn decode_scenario_json(text: &str) -> Result<ScenarioDocument, CoreError> {
    let raw: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| CoreError::validation("$", format!("Malformed JSON: {e}")))?;

    let violations = schema::check_document(&raw);
    if !violations.is_empty() {
        return Err(CoreError::Validation { violations });
    }

    let document: ScenarioDocument = serde_json::from_value(raw)
        .map_err(|e| CoreError::validation("$", format!("Invalid document: {e}")))?;

    let mut violations = assumption_violations(&document.assumptions);
    violations.extend(schema::check_semantics(&document));
    if !violations.is_empty() {
        return Err(CoreError::Validation { violations });
    }

    Ok(document)
}

fn assumption_violations(assumptions: &Assumptions) -> Vec<Violation> {
    let Err(errors) = assumptions.validate() else {
        return Vec::new();
    };
    let mut violations: Vec<Violation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed {} check", e.code));
                Violation::new(format!("assumptions.{field}"), message)
            })
        })
        .collect();
    violations.sort_by(|a, b| a.path.cmp(&b.path));
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "version": "0.1",
            "baseline_year": 2026,
            "actions": [
                {"id": "a1", "target": "mission.SANTE", "op": "increase", "amount_eur": 1000.0}
            ]
        })
    }

    #[test]
    fn decodes_minimal_document_with_defaults() {
        let doc = decode_scenario_json(&minimal().to_string()).unwrap();
        assert_eq!(doc.baseline_year, 2026);
        assert_eq!(doc.assumptions.horizon_years, DEFAULT_HORIZON_YEARS);
        assert_eq!(doc.assumptions.lens, Lens::Admin);
        assert_eq!(doc.actions[0].role, Role::Specified);
        assert!(!doc.actions[0].recurring);
        assert!(doc.offsets.is_empty());
        assert_eq!(doc.years(), vec![2026, 2027, 2028, 2029, 2030]);
    }

    #[test]
    fn numeric_version_is_accepted() {
        let mut value = minimal();
        value["version"] = json!(0.1);
        let doc = decode_scenario_json(&value.to_string()).unwrap();
        assert_eq!(doc.version, DocumentVersion::Number(0.1));
    }

    #[test]
    fn blob_round_trips_through_base64() {
        let doc = decode_scenario_json(&minimal().to_string()).unwrap();
        let blob = encode_scenario_blob(&doc);
        assert_eq!(decode_scenario_blob(&blob).unwrap(), doc);
    }

    #[test]
    fn invalid_base64_is_a_validation_error() {
        let err = decode_scenario_blob("%%%not-base64%%%").unwrap_err();
        assert_matches!(err, CoreError::Validation { .. });
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = decode_scenario_json("{\"version\":").unwrap_err();
        assert_matches!(err, CoreError::Validation { ref violations } if violations[0].path == "$");
    }

    #[test]
    fn horizon_out_of_range_is_reported_by_path() {
        let mut value = minimal();
        value["assumptions"] = json!({"horizon_years": 31});
        let err = decode_scenario_json(&value.to_string()).unwrap_err();
        assert_matches!(
            err,
            CoreError::Validation { ref violations }
                if violations.iter().any(|v| v.path == "assumptions.horizon_years")
        );
    }

    #[test]
    fn extreme_baseline_year_is_a_validation_error() {
        let mut value = minimal();
        value["baseline_year"] = json!(i32::MAX);
        let err = decode_scenario_json(&value.to_string()).unwrap_err();
        assert_matches!(
            err,
            CoreError::Validation { ref violations }
                if violations.len() == 1 && violations[0].path == "baseline_year"
        );
    }
}
