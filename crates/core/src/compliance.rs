//! Compliance evaluator: per-year verdicts for the EU deficit and debt
//! thresholds, the net expenditure growth rule, and the local balance rule
//! of the selected APU subsector.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::scenario::ApuSubsector;
use crate::threshold_validation::is_balanced;
use crate::types::Eur;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Ok,
    Breach,
    Above,
    Info,
    #[serde(rename = "n/a")]
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compliance {
    pub eu3pct: Vec<Verdict>,
    pub eu60pct: Vec<Verdict>,
    pub net_expenditure: Vec<Verdict>,
    /// Year-on-year growth of net expenditure, `None` where not computable.
    pub net_expenditure_growth: Vec<Option<f64>>,
    pub local_balance: Vec<Verdict>,
}

/// Everything the rules read, aligned with the horizon.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceInputs<'a> {
    pub gdp: &'a [Eur],
    pub deficit_path: &'a [Eur],
    pub debt_path: &'a [Eur],
    pub specified: &'a [Eur],
    pub offsets: &'a [Eur],
    /// Net expenditure baseline per year.
    pub net_expenditure_base: &'a [Eur],
    pub apu_subsector: Option<ApuSubsector>,
}

pub fn evaluate(inputs: &ComplianceInputs<'_>, config: &EngineConfig) -> Compliance {
    let (net_expenditure, net_expenditure_growth) = net_expenditure_rule(
        inputs.net_expenditure_base,
        inputs.specified,
        inputs.offsets,
        config.net_expenditure_reference_rate,
    );
    let local: Vec<Eur> = inputs
        .specified
        .iter()
        .zip(inputs.offsets)
        .map(|(s, o)| s + o)
        .collect();

    Compliance {
        eu3pct: eu_deficit_rule(inputs.deficit_path, inputs.gdp, config.eu_deficit_threshold),
        eu60pct: eu_debt_rule(inputs.debt_path, inputs.gdp, config.eu_debt_threshold),
        net_expenditure,
        net_expenditure_growth,
        local_balance: local_balance_rule(
            inputs.apu_subsector,
            &local,
            config.balance_tolerance_eur,
        ),
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn ratio(value: Eur, gdp: Eur) -> f64 {
    if gdp == 0.0 {
        0.0
    } else {
        value / gdp
    }
}

/// Breach when the balance (`-deficit`) falls below `-threshold` of GDP.
pub fn eu_deficit_rule(deficit: &[Eur], gdp: &[Eur], threshold: f64) -> Vec<Verdict> {
    deficit
        .iter()
        .zip(gdp)
        .map(|(d, g)| {
            if ratio(-d, *g) < -threshold {
                Verdict::Breach
            } else {
                Verdict::Ok
            }
        })
        .collect()
}

/// Informational: `above` when debt exceeds `threshold` of GDP.
pub fn eu_debt_rule(debt: &[Eur], gdp: &[Eur], threshold: f64) -> Vec<Verdict> {
    debt.iter()
        .zip(gdp)
        .map(|(d, g)| {
            if ratio(*d, *g) > threshold {
                Verdict::Above
            } else {
                Verdict::Info
            }
        })
        .collect()
}

/// Growth of net expenditure against `reference_rate`.
///
/// The first year compares against its own baseline, later years against
/// the previous year's adjusted level.
pub fn net_expenditure_rule(
    base: &[Eur],
    specified: &[Eur],
    offsets: &[Eur],
    reference_rate: f64,
) -> (Vec<Verdict>, Vec<Option<f64>>) {
    let levels: Vec<Eur> = base
        .iter()
        .zip(specified)
        .zip(offsets)
        .map(|((b, s), o)| b + s + o)
        .collect();

    let growth: Vec<Option<f64>> = levels
        .iter()
        .enumerate()
        .map(|(t, level)| {
            let previous = if t == 0 { base[0] } else { levels[t - 1] };
            (previous > 0.0).then(|| level / previous - 1.0)
        })
        .collect();

    let verdicts = growth
        .iter()
        .map(|g| match g {
            Some(rate) if *rate > reference_rate => Verdict::Breach,
            Some(_) => Verdict::Ok,
            None => Verdict::NotApplicable,
        })
        .collect();

    (verdicts, growth)
}

/// Local balance of the scenario's own deltas (specified plus offsets).
///
/// APUC is judged on the cumulative total in the final year, intermediate
/// years being informational. APUL and ASSO must balance every year.
pub fn local_balance_rule(
    subsector: Option<ApuSubsector>,
    deltas: &[Eur],
    tolerance: Eur,
) -> Vec<Verdict> {
    let verdict = |balanced: bool| if balanced { Verdict::Ok } else { Verdict::Breach };
    match subsector {
        None => vec![Verdict::NotApplicable; deltas.len()],
        Some(ApuSubsector::Apuc) => {
            let last = deltas.len().saturating_sub(1);
            let cumulative: Eur = deltas.iter().sum();
            (0..deltas.len())
                .map(|t| {
                    if t == last {
                        verdict(is_balanced(cumulative, tolerance))
                    } else {
                        Verdict::Info
                    }
                })
                .collect()
        }
        Some(ApuSubsector::Apul | ApuSubsector::Asso) => deltas
            .iter()
            .map(|d| verdict(is_balanced(*d, tolerance)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: f64 = 1_000_000.0;

    #[test]
    fn verdicts_serialize_as_strings() {
        let json = serde_json::to_string(&[Verdict::Ok, Verdict::NotApplicable, Verdict::Above])
            .unwrap();
        assert_eq!(json, r#"["ok","n/a","above"]"#);
    }

    #[test]
    fn deficit_beyond_three_percent_is_a_breach() {
        let v = eu_deficit_rule(&[20.0, 40.0, -40.0], &[1_000.0; 3], 0.03);
        assert_eq!(v, vec![Verdict::Ok, Verdict::Breach, Verdict::Ok]);
    }

    #[test]
    fn debt_rule_is_informational() {
        let v = eu_debt_rule(&[500.0, 700.0], &[1_000.0; 2], 0.60);
        assert_eq!(v, vec![Verdict::Info, Verdict::Above]);
    }

    #[test]
    fn net_expenditure_growth_against_reference() {
        let (v, g) = net_expenditure_rule(
            &[1_000.0, 1_000.0, 1_000.0],
            &[10.0, 40.0, 40.0],
            &[0.0; 3],
            0.015,
        );
        // 1%, then 1040 / 1010 - 1 ~ 2.97%, then flat.
        assert_eq!(v, vec![Verdict::Ok, Verdict::Breach, Verdict::Ok]);
        assert!((g[0].unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(g[2], Some(0.0));
    }

    #[test]
    fn net_expenditure_without_base_is_not_applicable() {
        let (v, g) = net_expenditure_rule(&[0.0, 0.0], &[0.0, 5.0], &[0.0, 0.0], 0.015);
        assert_eq!(v, vec![Verdict::NotApplicable, Verdict::NotApplicable]);
        assert_eq!(g, vec![None, None]);
    }

    #[test]
    fn apuc_is_cumulative() {
        let v = local_balance_rule(
            Some(ApuSubsector::Apuc),
            &[500.0 * M, 0.0, -500.0 * M],
            1.0,
        );
        assert_eq!(v, vec![Verdict::Info, Verdict::Info, Verdict::Ok]);

        let v = local_balance_rule(Some(ApuSubsector::Apuc), &[500.0 * M, 0.0, 0.0], 1.0);
        assert_eq!(v[2], Verdict::Breach);
    }

    #[test]
    fn apul_and_asso_balance_every_year() {
        let v = local_balance_rule(Some(ApuSubsector::Apul), &[500.0 * M, 0.0], 1.0);
        assert_eq!(v, vec![Verdict::Breach, Verdict::Ok]);
        let v = local_balance_rule(Some(ApuSubsector::Asso), &[0.5, -0.5], 1.0);
        assert_eq!(v, vec![Verdict::Ok, Verdict::Ok]);
    }

    #[test]
    fn no_subsector_is_not_applicable() {
        let v = local_balance_rule(None, &[1.0, 2.0], 1.0);
        assert_eq!(v, vec![Verdict::NotApplicable; 2]);
    }
}
