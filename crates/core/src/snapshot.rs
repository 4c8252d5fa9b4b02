//! Immutable baseline and catalog snapshots.
//!
//! A [`Snapshot`] bundles everything the engine reads: budget pieces for one
//! year, the lever catalog, the COFOG-to-mission bridge and the macro
//! baseline series. It is built once, never mutated, and shared as
//! `Arc<Snapshot>`. [`SnapshotStore`] swaps in a fresh snapshot atomically;
//! computations already holding the previous `Arc` are unaffected.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scenario::Lens;
use crate::types::{Eur, Timestamp, Year};

// ---------------------------------------------------------------------------
// Budget pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    Expenditure,
    Revenue,
}

/// One entry of a mapping list. Weights within a list sum to 1.0; that is
/// guaranteed by the ingestion side and not re-checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCode {
    pub code: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PieceMapping {
    #[serde(default)]
    pub cofog: Vec<WeightedCode>,
    #[serde(default)]
    pub mission: Vec<WeightedCode>,
    #[serde(default, alias = "esa")]
    pub na_item: Vec<WeightedCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PctBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PiecePolicy {
    #[serde(default)]
    pub locked_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_pct: Option<PctBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPiece {
    pub id: String,
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    pub amount_eur: Eur,
    #[serde(default)]
    pub mapping: PieceMapping,
    #[serde(default)]
    pub policy: PiecePolicy,
}

impl BudgetPiece {
    /// Mass weights of this piece under the given lens. COFOG codes are
    /// folded onto their major function.
    pub fn mass_weights(&self, lens: Lens) -> Vec<(String, f64)> {
        match lens {
            Lens::Admin => self
                .mapping
                .mission
                .iter()
                .map(|m| (m.code.clone(), m.weight))
                .collect(),
            Lens::Cofog => self
                .mapping
                .cofog
                .iter()
                .map(|c| (cofog_major(&c.code).to_string(), c.weight))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetBaseline {
    pub year: Year,
    pub pieces: Vec<BudgetPiece>,
}

// ---------------------------------------------------------------------------
// Levers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetSide {
    Spending,
    Revenue,
}

/// A catalog policy lever.
///
/// Impacts are saving-positive: a positive `fixed_impact_eur` is a spending
/// saving or a revenue gain, i.e. it reduces the deficit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lever {
    pub id: String,
    pub family: String,
    pub budget_side: BudgetSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_impact_eur: Option<Eur>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_year_impact: Option<BTreeMap<Year, Eur>>,
    #[serde(default)]
    pub cofog_mapping: BTreeMap<String, f64>,
    #[serde(default)]
    pub mission_mapping: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeverCatalog {
    pub levers: Vec<Lever>,
}

// ---------------------------------------------------------------------------
// COFOG <-> mission bridge
// ---------------------------------------------------------------------------

/// Share `weight` of COFOG function `cofog` that is carried by `mission`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEntry {
    pub cofog: String,
    pub mission: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CofogMissionBridge {
    pub entries: Vec<BridgeEntry>,
}

impl CofogMissionBridge {
    /// Missions carrying a COFOG code, weights normalized to 1.0.
    ///
    /// Exact code matches win; otherwise entries sharing the major function
    /// are used.
    pub fn missions_for_cofog(&self, code: &str) -> Vec<(String, f64)> {
        let exact: Vec<&BridgeEntry> = self.entries.iter().filter(|e| e.cofog == code).collect();
        let matched = if exact.is_empty() {
            let major = cofog_major(code);
            self.entries
                .iter()
                .filter(|e| cofog_major(&e.cofog) == major)
                .collect()
        } else {
            exact
        };
        normalize(matched.into_iter().map(|e| (e.mission.clone(), e.weight)))
    }

    /// COFOG major functions carried by a mission, weights normalized to 1.0.
    pub fn cofogs_for_mission(&self, mission: &str) -> Vec<(String, f64)> {
        normalize(
            self.entries
                .iter()
                .filter(|e| e.mission == mission)
                .map(|e| (cofog_major(&e.cofog).to_string(), e.weight)),
        )
    }
}

fn normalize(pairs: impl Iterator<Item = (String, f64)>) -> Vec<(String, f64)> {
    let mut merged: BTreeMap<String, f64> = BTreeMap::new();
    for (code, weight) in pairs {
        *merged.entry(code).or_default() += weight;
    }
    let total: f64 = merged.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    merged.into_iter().map(|(code, w)| (code, w / total)).collect()
}

/// Major COFOG function of a code: `"07.3"` -> `"07"`.
pub fn cofog_major(code: &str) -> &str {
    code.split('.').next().unwrap_or(code)
}

// ---------------------------------------------------------------------------
// Macro baseline series
// ---------------------------------------------------------------------------

/// Baseline GDP, deficit (positive = deficit) and debt, keyed by year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSeries {
    pub gdp: BTreeMap<Year, Eur>,
    pub deficit: BTreeMap<Year, Eur>,
    pub debt: BTreeMap<Year, Eur>,
    /// Optional net primary expenditure path for the expenditure rule.
    #[serde(default)]
    pub net_expenditure: BTreeMap<Year, Eur>,
}

impl BaselineSeries {
    /// Values of `series` for each of `years`, or the first missing year.
    pub fn path(
        series: &BTreeMap<Year, Eur>,
        name: &str,
        years: &[Year],
    ) -> Result<Vec<Eur>, CoreError> {
        years
            .iter()
            .map(|year| {
                series.get(year).copied().ok_or_else(|| {
                    CoreError::MissingBaseline(format!("no baseline {name} for year {year}"))
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub loaded_at: Timestamp,
    pub baseline: BudgetBaseline,
    pub levers: LeverCatalog,
    pub bridge: CofogMissionBridge,
    pub series: BaselineSeries,
    piece_index: HashMap<String, usize>,
    lever_index: HashMap<String, usize>,
    missions: BTreeSet<String>,
    cofog_majors: BTreeSet<String>,
}

impl Snapshot {
    pub fn new(
        baseline: BudgetBaseline,
        levers: LeverCatalog,
        bridge: CofogMissionBridge,
        series: BaselineSeries,
    ) -> Self {
        let piece_index = baseline
            .pieces
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let lever_index = levers
            .levers
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.clone(), i))
            .collect();

        let mut missions = BTreeSet::new();
        let mut cofog_majors = BTreeSet::new();
        for piece in &baseline.pieces {
            missions.extend(piece.mapping.mission.iter().map(|m| m.code.clone()));
            cofog_majors.extend(piece.mapping.cofog.iter().map(|c| cofog_major(&c.code).to_string()));
        }
        for lever in &levers.levers {
            missions.extend(lever.mission_mapping.keys().cloned());
            cofog_majors.extend(lever.cofog_mapping.keys().map(|c| cofog_major(c).to_string()));
        }
        for entry in &bridge.entries {
            missions.insert(entry.mission.clone());
            cofog_majors.insert(cofog_major(&entry.cofog).to_string());
        }

        Self {
            version: 1,
            loaded_at: chrono::Utc::now(),
            baseline,
            levers,
            bridge,
            series,
            piece_index,
            lever_index,
            missions,
            cofog_majors,
        }
    }

    pub fn piece(&self, id: &str) -> Option<&BudgetPiece> {
        self.piece_index.get(id).map(|&i| &self.baseline.pieces[i])
    }

    pub fn lever(&self, id: &str) -> Option<&Lever> {
        self.lever_index.get(id).map(|&i| &self.levers.levers[i])
    }

    pub fn has_mission(&self, code: &str) -> bool {
        self.missions.contains(code)
    }

    pub fn has_cofog(&self, code: &str) -> bool {
        self.cofog_majors.contains(cofog_major(code))
    }

    /// Fail unless the budget baseline matches the requested year.
    pub fn require_year(&self, year: Year) -> Result<(), CoreError> {
        if self.baseline.year != year {
            return Err(CoreError::MissingBaseline(format!(
                "budget baseline is for {}, scenario requests {year}",
                self.baseline.year
            )));
        }
        if self.baseline.pieces.is_empty() {
            return Err(CoreError::MissingBaseline(format!(
                "budget baseline for {year} has no pieces"
            )));
        }
        Ok(())
    }

    /// Baseline expenditure of a mass (mission code or COFOG major).
    pub fn mass_baseline(&self, lens: Lens, mass: &str) -> Eur {
        let key = match lens {
            Lens::Admin => mass,
            Lens::Cofog => cofog_major(mass),
        };
        self.baseline
            .pieces
            .iter()
            .filter(|p| p.piece_type == PieceType::Expenditure)
            .flat_map(|p| {
                p.mass_weights(lens)
                    .into_iter()
                    .filter(|(code, _)| code == key)
                    .map(move |(_, w)| p.amount_eur * w)
            })
            .sum()
    }

    /// Baseline expenditure under a COFOG code and its sub-functions.
    /// `07` covers `07.1` and `07.3`; `07.3` covers only itself.
    pub fn cofog_baseline(&self, code: &str) -> Eur {
        let prefix = format!("{code}.");
        self.baseline
            .pieces
            .iter()
            .filter(|p| p.piece_type == PieceType::Expenditure)
            .flat_map(|p| {
                p.mapping
                    .cofog
                    .iter()
                    .filter(|c| c.code == code || c.code.starts_with(&prefix))
                    .map(move |c| p.amount_eur * c.weight)
            })
            .sum()
    }

    /// Baseline revenue collected under a tax (national-accounts) code.
    pub fn tax_baseline(&self, code: &str) -> Eur {
        self.baseline
            .pieces
            .iter()
            .filter(|p| p.piece_type == PieceType::Revenue)
            .flat_map(|p| {
                p.mapping
                    .na_item
                    .iter()
                    .filter(|n| n.code == code)
                    .map(move |n| p.amount_eur * n.weight)
            })
            .sum()
    }

    /// Total baseline expenditure across all pieces.
    pub fn total_expenditure(&self) -> Eur {
        self.baseline
            .pieces
            .iter()
            .filter(|p| p.piece_type == PieceType::Expenditure)
            .map(|p| p.amount_eur)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Holder of the current snapshot. Readers clone the `Arc`; reloads replace
/// it wholesale.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot in effect right now.
    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `next` as the current snapshot and return its version.
    pub fn swap(&self, mut next: Snapshot) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        next.version = guard.version + 1;
        let version = next.version;
        *guard = Arc::new(next);
        tracing::info!(version, "Snapshot swapped");
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn wc(code: &str, weight: f64) -> WeightedCode {
        WeightedCode {
            code: code.into(),
            weight,
        }
    }

    fn piece(id: &str, piece_type: PieceType, amount: f64) -> BudgetPiece {
        BudgetPiece {
            id: id.into(),
            piece_type,
            amount_eur: amount,
            mapping: PieceMapping {
                cofog: vec![wc("07.3", 1.0)],
                mission: vec![wc("SANTE", 0.75), wc("SOLIDARITE", 0.25)],
                na_item: vec![wc("D51", 1.0)],
            },
            policy: PiecePolicy::default(),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(
            BudgetBaseline {
                year: 2026,
                pieces: vec![
                    piece("hosp", PieceType::Expenditure, 1000.0),
                    piece("ir", PieceType::Revenue, 400.0),
                ],
            },
            LeverCatalog::default(),
            CofogMissionBridge {
                entries: vec![
                    BridgeEntry {
                        cofog: "09".into(),
                        mission: "ENSEIGNEMENT".into(),
                        weight: 3.0,
                    },
                    BridgeEntry {
                        cofog: "09.2".into(),
                        mission: "RECHERCHE".into(),
                        weight: 1.0,
                    },
                ],
            },
            BaselineSeries::default(),
        )
    }

    #[test]
    fn lookups_by_id() {
        let s = snapshot();
        assert!(s.piece("hosp").is_some());
        assert!(s.piece("nope").is_none());
        assert!(s.has_mission("SANTE"));
        assert!(s.has_mission("ENSEIGNEMENT"));
        assert!(s.has_cofog("07"));
        assert!(s.has_cofog("09.1"));
        assert!(!s.has_cofog("03"));
    }

    #[test]
    fn mass_baseline_uses_expenditure_weights() {
        let s = snapshot();
        assert!((s.mass_baseline(Lens::Admin, "SANTE") - 750.0).abs() < 1e-9);
        assert!((s.mass_baseline(Lens::Cofog, "07") - 1000.0).abs() < 1e-9);
        assert!((s.tax_baseline("D51") - 400.0).abs() < 1e-9);
        assert!((s.total_expenditure() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn cofog_baseline_keeps_sub_functions_apart() {
        let mut outpatient = piece("outpatient", PieceType::Expenditure, 500.0);
        outpatient.mapping.cofog = vec![wc("07.1", 1.0)];
        let mut s = snapshot();
        s.baseline.pieces.push(outpatient);

        assert!((s.cofog_baseline("07.3") - 1000.0).abs() < 1e-9);
        assert!((s.cofog_baseline("07.1") - 500.0).abs() < 1e-9);
        assert!((s.cofog_baseline("07") - 1500.0).abs() < 1e-9);
        // Codes match by whole segments.
        assert_eq!(s.cofog_baseline("7"), 0.0);
    }

    #[test]
    fn bridge_prefers_exact_codes_and_normalizes() {
        let s = snapshot();
        assert_eq!(s.bridge.missions_for_cofog("09.2"), vec![("RECHERCHE".to_string(), 1.0)]);
        let by_major = s.bridge.missions_for_cofog("09.5");
        assert_eq!(by_major.len(), 2);
        let total: f64 = by_major.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(s.bridge.cofogs_for_mission("RECHERCHE"), vec![("09".to_string(), 1.0)]);
    }

    #[test]
    fn require_year_rejects_other_years() {
        let s = snapshot();
        assert!(s.require_year(2026).is_ok());
        assert_matches!(s.require_year(2027), Err(CoreError::MissingBaseline(_)));
    }

    #[test]
    fn missing_series_year_is_reported() {
        let mut gdp = BTreeMap::new();
        gdp.insert(2026, 100.0);
        let err = BaselineSeries::path(&gdp, "gdp", &[2026, 2027]).unwrap_err();
        assert!(err.to_string().contains("2027"));
    }

    #[test]
    fn store_swaps_without_disturbing_readers() {
        let store = SnapshotStore::new(snapshot());
        let before = store.current();
        assert_eq!(before.version, 1);

        let version = store.swap(snapshot());
        assert_eq!(version, 2);
        assert_eq!(before.version, 1);
        assert_eq!(store.current().version, 2);
    }
}
