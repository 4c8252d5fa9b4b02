//! Accounting assembler: baseline series plus deficit deltas, cumulated
//! into debt, divided into GDP ratios.

use serde::Serialize;

use crate::types::{Eur, Year};
use crate::warnings::{self, Warnings};

/// Deficit-delta paths by source. Target-only actions never appear here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeficitDeltas {
    pub specified: Vec<Eur>,
    pub offsets: Vec<Eur>,
    #[serde(rename = "macro")]
    pub macro_feedback: Vec<Eur>,
    pub total: Vec<Eur>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ratios {
    pub deficit_to_gdp: Vec<f64>,
    pub debt_to_gdp: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accounting {
    /// Deficit in euros, positive when the budget is in deficit.
    pub deficit_path: Vec<Eur>,
    pub debt_path: Vec<Eur>,
    pub deltas: DeficitDeltas,
    pub ratios: Ratios,
}

/// Baseline paths for the horizon, aligned with `years`.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselinePaths {
    pub years: Vec<Year>,
    pub gdp: Vec<Eur>,
    pub deficit: Vec<Eur>,
    pub debt: Vec<Eur>,
}

pub fn assemble(
    baseline: &BaselinePaths,
    specified: &[Eur],
    offsets: &[Eur],
    macro_deficit: &[Eur],
    warnings: &mut Warnings,
) -> Accounting {
    let total: Vec<Eur> = specified
        .iter()
        .zip(offsets)
        .zip(macro_deficit)
        .map(|((s, o), m)| s + o + m)
        .collect();

    let deficit_path: Vec<Eur> = baseline
        .deficit
        .iter()
        .zip(&total)
        .map(|(base, delta)| base + delta)
        .collect();

    let debt_path: Vec<Eur> = baseline
        .debt
        .iter()
        .zip(&total)
        .scan(0.0, |cumulative, (base, delta)| {
            *cumulative += delta;
            Some(base + *cumulative)
        })
        .collect();

    let deficit_to_gdp = ratios(&deficit_path, baseline, warnings);
    let debt_to_gdp = ratios(&debt_path, baseline, warnings);

    Accounting {
        deficit_path,
        debt_path,
        deltas: DeficitDeltas {
            specified: specified.to_vec(),
            offsets: offsets.to_vec(),
            macro_feedback: macro_deficit.to_vec(),
            total,
        },
        ratios: Ratios {
            deficit_to_gdp,
            debt_to_gdp,
        },
    }
}

fn ratios(values: &[Eur], baseline: &BaselinePaths, warnings: &mut Warnings) -> Vec<f64> {
    values
        .iter()
        .zip(&baseline.gdp)
        .zip(&baseline.years)
        .map(|((value, gdp), year)| {
            if *gdp == 0.0 {
                warnings.push(
                    warnings::WARN_ZERO_GDP,
                    format!("baseline GDP is zero in {year}; ratio reported as 0"),
                );
                0.0
            } else {
                value / gdp
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> BaselinePaths {
        BaselinePaths {
            years: vec![2026, 2027, 2028],
            gdp: vec![1_000.0, 1_000.0, 0.0],
            deficit: vec![50.0, 50.0, 50.0],
            debt: vec![600.0, 650.0, 700.0],
        }
    }

    #[test]
    fn debt_accumulates_deficit_deltas() {
        let mut w = Warnings::default();
        let acc = assemble(
            &baseline(),
            &[10.0, 10.0, 10.0],
            &[-5.0, 0.0, 0.0],
            &[0.0, -1.0, 0.0],
            &mut w,
        );
        assert_eq!(acc.deltas.total, vec![5.0, 9.0, 10.0]);
        assert_eq!(acc.deficit_path, vec![55.0, 59.0, 60.0]);
        assert_eq!(acc.debt_path, vec![605.0, 664.0, 724.0]);
        assert_eq!(acc.ratios.deficit_to_gdp[0], 0.055);
    }

    #[test]
    fn zero_gdp_gives_zero_ratio_and_a_warning() {
        let mut w = Warnings::default();
        let acc = assemble(&baseline(), &[0.0; 3], &[0.0; 3], &[0.0; 3], &mut w);
        assert_eq!(acc.ratios.debt_to_gdp[2], 0.0);
        let codes: Vec<&str> = w.into_vec().iter().map(|w| w.code).collect();
        assert!(codes.contains(&warnings::WARN_ZERO_GDP));
    }
}
