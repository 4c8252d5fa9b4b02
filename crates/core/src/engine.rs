//! Scenario engine entry points.
//!
//! One call runs the whole pipeline synchronously against a snapshot:
//! normalize, mechanical deltas, mass resolution, macro feedback,
//! accounting, compliance. Nothing survives the call.

use crate::accounting::{self, BaselinePaths};
use crate::compliance::{self, ComplianceInputs};
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::hashing::scenario_id;
use crate::macro_feedback::compute_feedback;
use crate::mechanical::compute_deltas;
use crate::normalizer::normalize;
use crate::resolution::resolve;
use crate::scenario::{decode_scenario_blob, ScenarioDocument};
use crate::snapshot::{BaselineSeries, Snapshot};
use crate::types::{Eur, ScenarioResult, Year};
use crate::warnings::Warnings;

/// Simulate a decoded scenario document.
pub fn simulate(
    document: &ScenarioDocument,
    snapshot: &Snapshot,
    config: &EngineConfig,
) -> Result<ScenarioResult, CoreError> {
    config.macro_params.check()?;

    let scenario = normalize(document, snapshot)?;
    let baseline = baseline_paths(snapshot, &scenario.years)?;
    let net_expenditure_base = net_expenditure_base(snapshot, &scenario.years)?;

    let mut warnings = Warnings::default();
    let deltas = compute_deltas(&scenario, snapshot, &baseline.gdp, &mut warnings);
    let resolution = resolve(&scenario, &deltas, snapshot, &mut warnings);
    let macro_outcome = compute_feedback(&deltas.shocks, &baseline.gdp, &config.macro_params);

    let accounting = accounting::assemble(
        &baseline,
        &deltas.specified,
        &deltas.offsets,
        &macro_outcome.delta_deficit,
        &mut warnings,
    );

    let compliance = compliance::evaluate(
        &ComplianceInputs {
            gdp: &baseline.gdp,
            deficit_path: &accounting.deficit_path,
            debt_path: &accounting.debt_path,
            specified: &deltas.specified,
            offsets: &deltas.offsets,
            net_expenditure_base: &net_expenditure_base,
            apu_subsector: scenario.apu_subsector,
        },
        config,
    );

    let id = scenario_id(document);
    tracing::debug!(
        scenario_id = %id,
        snapshot_version = snapshot.version,
        warnings = warnings.len(),
        "Scenario simulated",
    );

    Ok(ScenarioResult {
        scenario_id: id,
        years: scenario.years.clone(),
        accounting,
        compliance,
        macro_outcome,
        resolution,
        warnings: warnings.into_vec(),
    })
}

/// Decode a base64 scenario blob and simulate it.
pub fn simulate_blob(
    blob: &str,
    snapshot: &Snapshot,
    config: &EngineConfig,
) -> Result<ScenarioResult, CoreError> {
    let document = decode_scenario_blob(blob)?;
    simulate(&document, snapshot, config)
}

fn baseline_paths(snapshot: &Snapshot, years: &[Year]) -> Result<BaselinePaths, CoreError> {
    let series = &snapshot.series;
    Ok(BaselinePaths {
        years: years.to_vec(),
        gdp: BaselineSeries::path(&series.gdp, "gdp", years)?,
        deficit: BaselineSeries::path(&series.deficit, "deficit", years)?,
        debt: BaselineSeries::path(&series.debt, "debt", years)?,
    })
}

/// The explicit net expenditure series when the snapshot carries one,
/// otherwise total piece expenditure held flat.
fn net_expenditure_base(snapshot: &Snapshot, years: &[Year]) -> Result<Vec<Eur>, CoreError> {
    let series = &snapshot.series.net_expenditure;
    if series.is_empty() {
        Ok(vec![snapshot.total_expenditure(); years.len()])
    } else {
        BaselineSeries::path(series, "net_expenditure", years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::Verdict;
    use crate::scenario::{decode_scenario_json, encode_scenario_blob};
    use crate::snapshot::{
        BudgetBaseline, BudgetPiece, CofogMissionBridge, LeverCatalog, PieceMapping, PiecePolicy,
        PieceType, WeightedCode,
    };
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn snapshot(series_years: &[Year]) -> Snapshot {
        let per_year = |value: f64| -> BTreeMap<Year, Eur> {
            series_years.iter().map(|y| (*y, value)).collect()
        };
        Snapshot::new(
            BudgetBaseline {
                year: 2026,
                pieces: vec![BudgetPiece {
                    id: "defence".into(),
                    piece_type: PieceType::Expenditure,
                    amount_eur: 50_000.0,
                    mapping: PieceMapping {
                        cofog: vec![WeightedCode {
                            code: "02".into(),
                            weight: 1.0,
                        }],
                        mission: vec![WeightedCode {
                            code: "DEFENSE".into(),
                            weight: 1.0,
                        }],
                        na_item: vec![],
                    },
                    policy: PiecePolicy::default(),
                }],
            },
            LeverCatalog::default(),
            CofogMissionBridge::default(),
            BaselineSeries {
                gdp: per_year(1_000_000.0),
                deficit: per_year(40_000.0),
                debt: per_year(1_100_000.0),
                net_expenditure: Default::default(),
            },
        )
    }

    fn document(horizon: u32) -> ScenarioDocument {
        decode_scenario_json(
            &json!({
                "version": "0.1",
                "baseline_year": 2026,
                "assumptions": {"horizon_years": horizon},
                "actions": [
                    {"id": "a", "target": "piece.defence", "op": "increase", "amount_eur": 10_000.0, "recurring": true}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn full_pipeline_produces_aligned_paths() {
        let snap = snapshot(&[2026, 2027]);
        let result = simulate(&document(2), &snap, &EngineConfig::default()).unwrap();
        assert_eq!(result.years, vec![2026, 2027]);
        assert_eq!(result.accounting.deltas.specified, vec![10_000.0, 10_000.0]);
        assert_eq!(result.compliance.eu3pct.len(), 2);
        assert_eq!(result.compliance.eu60pct, vec![Verdict::Above, Verdict::Above]);
        // Defence spending has an IRF, so GDP responds and improves the deficit.
        assert!(result.macro_outcome.delta_gdp[0] > 0.0);
        assert!(result.accounting.deltas.macro_feedback[0] < 0.0);
        assert_eq!(result.scenario_id.len(), 64);
    }

    #[test]
    fn blob_entry_point_matches_document_entry_point() {
        let snap = snapshot(&[2026, 2027]);
        let doc = document(2);
        let config = EngineConfig::default();
        let from_blob = simulate_blob(&encode_scenario_blob(&doc), &snap, &config).unwrap();
        assert_eq!(from_blob, simulate(&doc, &snap, &config).unwrap());
    }

    #[test]
    fn missing_series_year_is_fatal() {
        let snap = snapshot(&[2026]);
        let err = simulate(&document(2), &snap, &EngineConfig::default()).unwrap_err();
        assert_matches!(err, CoreError::MissingBaseline(ref msg) if msg.contains("2027"));
    }

    #[test]
    fn invalid_macro_params_are_rejected() {
        let snap = snapshot(&[2026, 2027]);
        let mut config = EngineConfig::default();
        config.macro_params.okun_elasticity = -1.0;
        assert_matches!(
            simulate(&document(2), &snap, &config),
            Err(CoreError::Validation { .. })
        );
    }

    #[test]
    fn net_expenditure_falls_back_to_piece_totals() {
        let snap = snapshot(&[2026, 2027]);
        let result = simulate(&document(2), &snap, &EngineConfig::without_macro_feedback()).unwrap();
        // 10k on a 50k base is 20% growth in the first year, flat after.
        assert_eq!(
            result.compliance.net_expenditure,
            vec![Verdict::Breach, Verdict::Ok]
        );
    }
}
