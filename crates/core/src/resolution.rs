//! Mass resolution: reconciles stated targets per mass with the actions that
//! actually schedule changes there ("bucket filling").
//!
//! Targets are a diagnostic overlay. Nothing computed here feeds the
//! deficit; the accounting stage only ever sees specified deltas.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::mechanical::MechanicalDeltas;
use crate::normalizer::{NormalizedScenario, ResolvedTarget};
use crate::scenario::{Lens, Role};
use crate::snapshot::{cofog_major, Snapshot};
use crate::types::Eur;
use crate::warnings::{self, Warnings};

/// Upper bound of the reported coverage percentage.
pub const MAX_OVERALL_PCT: f64 = 100.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a mass's specified delta relates to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillState {
    /// No target set for the mass.
    Untargeted,
    /// Specified covers less than the target; the gap is unspecified.
    Underflow,
    /// Specified meets or exceeds the target; never throttled back.
    Overflow,
    /// Specified moves the opposite way from the target.
    Independent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassResolution {
    pub mass_id: String,
    pub target_delta_eur: Eur,
    pub specified_delta_eur: Eur,
    pub unspecified_cp_delta_eur: Eur,
    pub cp_delta_eur: Eur,
    pub fill: FillState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub lens: Lens,
    pub overall_pct: f64,
    pub by_mass: Vec<MassResolution>,
}

// ---------------------------------------------------------------------------
// Bucket filling
// ---------------------------------------------------------------------------

/// Outcome of filling one mass bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub unspecified_cp_delta_eur: Eur,
    pub cp_delta_eur: Eur,
    pub state: FillState,
}

/// Reconcile a mass target with its specified delta.
///
/// A zero target is treated as no target.
pub fn bucket_fill(target: Option<Eur>, specified: Eur) -> Fill {
    let target = match target {
        Some(t) if t != 0.0 => t,
        _ => {
            return Fill {
                unspecified_cp_delta_eur: 0.0,
                cp_delta_eur: specified,
                state: FillState::Untargeted,
            }
        }
    };

    if specified != 0.0 && specified.signum() != target.signum() {
        return Fill {
            unspecified_cp_delta_eur: target,
            cp_delta_eur: target + specified,
            state: FillState::Independent,
        };
    }

    if specified.abs() >= target.abs() {
        Fill {
            unspecified_cp_delta_eur: 0.0,
            cp_delta_eur: specified,
            state: FillState::Overflow,
        }
    } else {
        Fill {
            unspecified_cp_delta_eur: target - specified,
            cp_delta_eur: target,
            state: FillState::Underflow,
        }
    }
}

// ---------------------------------------------------------------------------
// Mass weights
// ---------------------------------------------------------------------------

/// Masses a target contributes to under `lens`, with weights.
pub fn mass_weights(target: &ResolvedTarget<'_>, lens: Lens, snapshot: &Snapshot) -> Vec<(String, f64)> {
    match (target, lens) {
        (ResolvedTarget::Piece(piece), _) => piece.mass_weights(lens),
        (ResolvedTarget::Lever(lever), Lens::Admin) => {
            if !lever.mission_mapping.is_empty() {
                lever
                    .mission_mapping
                    .iter()
                    .map(|(m, w)| (m.clone(), *w))
                    .collect()
            } else {
                merge(lever.cofog_mapping.iter().flat_map(|(code, w)| {
                    snapshot
                        .bridge
                        .missions_for_cofog(code)
                        .into_iter()
                        .map(move |(m, share)| (m, w * share))
                }))
            }
        }
        (ResolvedTarget::Lever(lever), Lens::Cofog) => {
            if !lever.cofog_mapping.is_empty() {
                merge(
                    lever
                        .cofog_mapping
                        .iter()
                        .map(|(code, w)| (cofog_major(code).to_string(), *w)),
                )
            } else {
                merge(lever.mission_mapping.iter().flat_map(|(m, w)| {
                    snapshot
                        .bridge
                        .cofogs_for_mission(m)
                        .into_iter()
                        .map(move |(code, share)| (code, w * share))
                }))
            }
        }
        (ResolvedTarget::Mission(code), Lens::Admin) => vec![(code.to_string(), 1.0)],
        (ResolvedTarget::Mission(code), Lens::Cofog) => snapshot.bridge.cofogs_for_mission(code),
        (ResolvedTarget::Cofog(code), Lens::Admin) => snapshot.bridge.missions_for_cofog(code),
        (ResolvedTarget::Cofog(code), Lens::Cofog) => vec![(cofog_major(code).to_string(), 1.0)],
        (ResolvedTarget::Tax(_), _) => Vec::new(),
    }
}

fn merge(pairs: impl Iterator<Item = (String, f64)>) -> Vec<(String, f64)> {
    let mut merged: BTreeMap<String, f64> = BTreeMap::new();
    for (code, w) in pairs {
        *merged.entry(code).or_default() += w;
    }
    merged.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve every mass touched by at least one action.
///
/// Runs in two passes, targets first and specified deltas second, over
/// actions already sorted by id, so document order never matters.
/// Comparisons use first-year deltas.
pub fn resolve(
    scenario: &NormalizedScenario<'_>,
    deltas: &MechanicalDeltas,
    snapshot: &Snapshot,
    warnings: &mut Warnings,
) -> Resolution {
    let mut targets: BTreeMap<String, Eur> = BTreeMap::new();
    let mut specified: BTreeMap<String, Eur> = BTreeMap::new();

    for pass in [Role::Target, Role::Specified] {
        let bucket = match pass {
            Role::Target => &mut targets,
            Role::Specified => &mut specified,
        };
        for (action, delta) in scenario.actions.iter().zip(&deltas.actions) {
            if action.role != pass {
                continue;
            }
            let first_year = delta.path.first().copied().unwrap_or(0.0);
            let weights = mass_weights(&action.target, scenario.lens, snapshot);
            if weights.is_empty() && !matches!(action.target, ResolvedTarget::Tax(_)) {
                warnings.push(
                    warnings::WARN_UNMAPPED_CONTRIBUTION,
                    format!("action {} maps to no mass under the current lens", action.id),
                );
            }
            for (mass, weight) in weights {
                *bucket.entry(mass).or_default() += first_year * weight;
            }
        }
    }

    let mut masses: Vec<&String> = targets.keys().chain(specified.keys()).collect();
    masses.sort();
    masses.dedup();

    let mut covered = 0.0;
    let mut wanted = 0.0;
    let mut by_mass = Vec::with_capacity(masses.len());
    for mass in masses {
        let target = targets.get(mass).copied();
        let achieved = specified.get(mass).copied().unwrap_or(0.0);

        if target == Some(0.0) {
            warnings.push(
                warnings::WARN_ZERO_TARGET,
                format!("target for mass {mass} sums to zero; treated as untargeted"),
            );
        }

        let fill = bucket_fill(target, achieved);
        if let Some(t) = target.filter(|t| *t != 0.0) {
            wanted += t.abs();
            // Overflow on one mass never hides a shortfall on another.
            if achieved * t > 0.0 {
                covered += achieved.abs().min(t.abs());
            }
        }

        by_mass.push(MassResolution {
            mass_id: mass.clone(),
            target_delta_eur: target.unwrap_or(0.0),
            specified_delta_eur: achieved,
            unspecified_cp_delta_eur: fill.unspecified_cp_delta_eur,
            cp_delta_eur: fill.cp_delta_eur,
            fill: fill.state,
        });
    }

    let overall_pct = if wanted > 0.0 {
        (covered / wanted * 100.0).clamp(0.0, MAX_OVERALL_PCT)
    } else {
        0.0
    };

    tracing::debug!(masses = by_mass.len(), overall_pct, "Masses resolved");

    Resolution {
        lens: scenario.lens,
        overall_pct,
        by_mass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanical::compute_deltas;
    use crate::normalizer::normalize;
    use crate::scenario::decode_scenario_json;
    use crate::snapshot::{
        BaselineSeries, BridgeEntry, BudgetBaseline, BudgetPiece, BudgetSide, CofogMissionBridge,
        Lever, LeverCatalog, PieceMapping, PiecePolicy, PieceType, WeightedCode,
    };
    use serde_json::json;

    const BN: f64 = 1_000_000_000.0;

    // -- bucket_fill --

    #[test]
    fn underflow_reports_the_gap() {
        let fill = bucket_fill(Some(-10.0 * BN), -2.0 * BN);
        assert_eq!(fill.state, FillState::Underflow);
        assert_eq!(fill.unspecified_cp_delta_eur, -8.0 * BN);
        assert_eq!(fill.cp_delta_eur, -10.0 * BN);
    }

    #[test]
    fn overflow_is_never_throttled() {
        let fill = bucket_fill(Some(-10.0 * BN), -12.0 * BN);
        assert_eq!(fill.state, FillState::Overflow);
        assert_eq!(fill.unspecified_cp_delta_eur, 0.0);
        assert_eq!(fill.cp_delta_eur, -12.0 * BN);
    }

    #[test]
    fn exact_fill_counts_as_overflow() {
        let fill = bucket_fill(Some(5.0), 5.0);
        assert_eq!(fill.state, FillState::Overflow);
        assert_eq!(fill.unspecified_cp_delta_eur, 0.0);
    }

    #[test]
    fn no_target_passes_specified_through() {
        let fill = bucket_fill(None, 3.0);
        assert_eq!(fill.state, FillState::Untargeted);
        assert_eq!(fill.cp_delta_eur, 3.0);
        assert_eq!(fill.unspecified_cp_delta_eur, 0.0);
        assert_eq!(bucket_fill(Some(0.0), 3.0).state, FillState::Untargeted);
    }

    #[test]
    fn target_without_specified_is_all_unspecified() {
        let fill = bucket_fill(Some(-4.0), 0.0);
        assert_eq!(fill.state, FillState::Underflow);
        assert_eq!(fill.unspecified_cp_delta_eur, -4.0);
        assert_eq!(fill.cp_delta_eur, -4.0);
    }

    #[test]
    fn opposite_signs_are_independent() {
        let fill = bucket_fill(Some(-10.0), 3.0);
        assert_eq!(fill.state, FillState::Independent);
        assert_eq!(fill.unspecified_cp_delta_eur, -10.0);
        assert_eq!(fill.cp_delta_eur, -7.0);
    }

    // -- resolve --

    fn snapshot() -> Snapshot {
        let piece = |id: &str, mission: &str, cofog: &str| BudgetPiece {
            id: id.into(),
            piece_type: PieceType::Expenditure,
            amount_eur: 50.0 * BN,
            mapping: PieceMapping {
                cofog: vec![WeightedCode {
                    code: cofog.into(),
                    weight: 1.0,
                }],
                mission: vec![WeightedCode {
                    code: mission.into(),
                    weight: 1.0,
                }],
                na_item: vec![],
            },
            policy: PiecePolicy::default(),
        };
        Snapshot::new(
            BudgetBaseline {
                year: 2026,
                pieces: vec![
                    piece("hospitals", "SANTE", "07.3"),
                    piece("schools", "ENSEIGNEMENT", "09.1"),
                ],
            },
            LeverCatalog {
                levers: vec![Lever {
                    id: "drug_prices".into(),
                    family: "health".into(),
                    budget_side: BudgetSide::Spending,
                    fixed_impact_eur: Some(1.0 * BN),
                    multi_year_impact: None,
                    cofog_mapping: [("07".to_string(), 1.0)].into_iter().collect(),
                    mission_mapping: Default::default(),
                }],
            },
            CofogMissionBridge {
                entries: vec![
                    BridgeEntry {
                        cofog: "07".into(),
                        mission: "SANTE".into(),
                        weight: 1.0,
                    },
                    BridgeEntry {
                        cofog: "09".into(),
                        mission: "ENSEIGNEMENT".into(),
                        weight: 1.0,
                    },
                ],
            },
            BaselineSeries::default(),
        )
    }

    fn resolve_doc(lens: &str, actions: serde_json::Value) -> (Resolution, Warnings) {
        resolve_against(snapshot(), lens, actions)
    }

    fn resolve_against(
        snap: Snapshot,
        lens: &str,
        actions: serde_json::Value,
    ) -> (Resolution, Warnings) {
        let doc = decode_scenario_json(
            &json!({
                "version": "0.1",
                "baseline_year": 2026,
                "assumptions": {"horizon_years": 2, "lens": lens},
                "actions": actions
            })
            .to_string(),
        )
        .unwrap();
        let scenario = normalize(&doc, &snap).unwrap();
        let mut warnings = Warnings::default();
        let deltas = compute_deltas(&scenario, &snap, &[2_000.0 * BN; 2], &mut warnings);
        (resolve(&scenario, &deltas, &snap, &mut warnings), warnings)
    }

    #[test]
    fn lever_without_mission_mapping_is_bridged() {
        let (r, _) = resolve_doc(
            "ADMIN",
            json!([
                {"id": "goal", "target": "mission.SANTE", "op": "decrease", "amount_eur": 4.0 * BN, "role": "target"},
                {"id": "lever", "target": "lever.drug_prices", "op": "activate"}
            ]),
        );
        assert_eq!(r.by_mass.len(), 1);
        let sante = &r.by_mass[0];
        assert_eq!(sante.mass_id, "SANTE");
        assert_eq!(sante.target_delta_eur, -4.0 * BN);
        assert_eq!(sante.specified_delta_eur, -1.0 * BN);
        assert_eq!(sante.unspecified_cp_delta_eur, -3.0 * BN);
        assert!((r.overall_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn cofog_lens_groups_by_major_function() {
        let (r, _) = resolve_doc(
            "COFOG",
            json!([
                {"id": "a", "target": "piece.hospitals", "op": "decrease", "amount_eur": 2.0 * BN},
                {"id": "b", "target": "mission.ENSEIGNEMENT", "op": "increase", "amount_eur": 1.0 * BN, "role": "target"}
            ]),
        );
        let ids: Vec<&str> = r.by_mass.iter().map(|m| m.mass_id.as_str()).collect();
        assert_eq!(ids, vec!["07", "09"]);
        assert_eq!(r.by_mass[0].fill, FillState::Untargeted);
        assert_eq!(r.by_mass[1].fill, FillState::Underflow);
        assert_eq!(r.overall_pct, 0.0);
    }

    #[test]
    fn overall_pct_is_clamped_and_zero_without_targets() {
        let (over, _) = resolve_doc(
            "ADMIN",
            json!([
                {"id": "goal", "target": "mission.SANTE", "op": "decrease", "amount_eur": 1.0 * BN, "role": "target"},
                {"id": "cut", "target": "piece.hospitals", "op": "decrease", "amount_eur": 3.0 * BN}
            ]),
        );
        assert_eq!(over.overall_pct, MAX_OVERALL_PCT);

        let (none, _) = resolve_doc(
            "ADMIN",
            json!([{"id": "cut", "target": "piece.hospitals", "op": "decrease", "amount_eur": 3.0 * BN}]),
        );
        assert_eq!(none.overall_pct, 0.0);
    }

    #[test]
    fn zero_target_warns() {
        let (r, w) = resolve_doc(
            "ADMIN",
            json!([
                {"id": "goal", "target": "mission.SANTE", "op": "decrease", "amount_eur": 0.0, "role": "target"}
            ]),
        );
        assert_eq!(r.by_mass[0].fill, FillState::Untargeted);
        assert!(w.into_vec().iter().any(|w| w.code == warnings::WARN_ZERO_TARGET));
    }

    #[test]
    fn overflow_does_not_mask_another_shortfall() {
        let (r, _) = resolve_doc(
            "ADMIN",
            json!([
                {"id": "health_goal", "target": "mission.SANTE", "op": "decrease", "amount_eur": 1.0 * BN, "role": "target"},
                {"id": "school_goal", "target": "mission.ENSEIGNEMENT", "op": "decrease", "amount_eur": 1.0 * BN, "role": "target"},
                {"id": "cut", "target": "piece.hospitals", "op": "decrease", "amount_eur": 2.0 * BN}
            ]),
        );
        assert_eq!(r.by_mass[1].fill, FillState::Overflow);
        assert!((r.overall_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn mission_target_without_bridge_warns_under_cofog_lens() {
        let mut snap = snapshot();
        snap.bridge = CofogMissionBridge::default();
        let (r, w) = resolve_against(
            snap,
            "COFOG",
            json!([
                {"id": "goal", "target": "mission.SANTE", "op": "decrease", "amount_eur": 1.0 * BN, "role": "target"}
            ]),
        );
        assert!(r.by_mass.is_empty());
        assert_eq!(r.overall_pct, 0.0);
        let w = w.into_vec();
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].code, warnings::WARN_UNMAPPED_CONTRIBUTION);
    }
}
