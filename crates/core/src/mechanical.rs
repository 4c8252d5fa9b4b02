//! Mechanical delta engine: per-action deficit deltas by year, plus the
//! percent-of-GDP shocks they imply per macro category.
//!
//! Percentages and basis points resolve against baseline amounts frozen in
//! the snapshot, never against amounts already moved by other actions.

use std::collections::BTreeMap;

use crate::config::TAX_CATEGORY;
use crate::normalizer::{Magnitude, NormalizedAction, NormalizedScenario, ResolvedTarget};
use crate::scenario::{Lens, Pool, Role};
use crate::sign::deficit_sign;
use crate::snapshot::{BudgetSide, PieceType, Snapshot};
use crate::types::{Eur, Year};
use crate::warnings::{self, Warnings};

/// Basis points per unit.
pub const BPS_PER_UNIT: f64 = 10_000.0;

/// Deficit-delta path of one action, indexed like the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDelta {
    pub action_id: String,
    pub role: Role,
    pub path: Vec<Eur>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MechanicalDeltas {
    pub actions: Vec<ActionDelta>,
    /// Sum of specified (non-target) action paths.
    pub specified: Vec<Eur>,
    /// Sum of offset paths.
    pub offsets: Vec<Eur>,
    /// Category -> shock in percent of GDP, per year, from specified actions
    /// and offsets. Targets never shock.
    pub shocks: BTreeMap<String, Vec<f64>>,
}

/// Compute deltas for every action and offset of a normalized scenario.
///
/// `gdp` is the baseline GDP path aligned with `scenario.years`.
pub fn compute_deltas(
    scenario: &NormalizedScenario<'_>,
    snapshot: &Snapshot,
    gdp: &[Eur],
    warnings: &mut Warnings,
) -> MechanicalDeltas {
    let horizon = scenario.horizon();
    let mut actions = Vec::with_capacity(scenario.actions.len());
    let mut specified = vec![0.0; horizon];
    let mut shocks: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for action in &scenario.actions {
        let path = action_path(action, scenario, snapshot, warnings);

        if action.role == Role::Specified {
            for (total, delta) in specified.iter_mut().zip(&path) {
                *total += delta;
            }
            for (category, weight) in shock_categories(&action.target, snapshot) {
                let series = shocks
                    .entry(category)
                    .or_insert_with(|| vec![0.0; horizon]);
                for (t, delta) in path.iter().enumerate() {
                    if *delta == 0.0 {
                        continue;
                    }
                    if gdp[t] == 0.0 {
                        warnings.push(
                            warnings::WARN_ZERO_GDP,
                            format!("baseline GDP is zero in {}; shock dropped", scenario.years[t]),
                        );
                        continue;
                    }
                    series[t] += delta * weight / gdp[t] * 100.0;
                }
            }
        }

        actions.push(ActionDelta {
            action_id: action.id.to_string(),
            role: action.role,
            path,
        });
    }

    let mut offsets = vec![0.0; horizon];
    let mut offset_shocks: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for offset in &scenario.offsets {
        // Either pool reduces the deficit by the offset amount.
        let mut path = vec![0.0; horizon];
        spread(&mut path, -offset.amount_eur, offset.start_index, offset.recurring);

        for (t, delta) in path.iter().enumerate() {
            offsets[t] += delta;
            if *delta == 0.0 {
                continue;
            }
            if gdp[t] == 0.0 {
                warnings.push(
                    warnings::WARN_ZERO_GDP,
                    format!("baseline GDP is zero in {}; shock dropped", scenario.years[t]),
                );
                continue;
            }
            let shock = delta / gdp[t] * 100.0;
            for (category, weight) in offset_mix(offset.pool, &shocks, t) {
                let series = offset_shocks
                    .entry(category)
                    .or_insert_with(|| vec![0.0; horizon]);
                series[t] += shock * weight;
            }
        }
    }
    for (category, series) in offset_shocks {
        let total = shocks
            .entry(category)
            .or_insert_with(|| vec![0.0; horizon]);
        for (slot, shock) in total.iter_mut().zip(series) {
            *slot += shock;
        }
    }

    MechanicalDeltas {
        actions,
        specified,
        offsets,
        shocks,
    }
}

/// Deficit-delta path of a single action.
pub fn action_path(
    action: &NormalizedAction<'_>,
    scenario: &NormalizedScenario<'_>,
    snapshot: &Snapshot,
    warnings: &mut Warnings,
) -> Vec<Eur> {
    let horizon = scenario.horizon();
    let sign = deficit_sign(action.target.sign_kind(), action.op);
    let mut path = vec![0.0; horizon];

    if let (ResolvedTarget::Lever(lever), Magnitude::LeverImpact) = (action.target, action.magnitude)
    {
        if let Some(schedule) = &lever.multi_year_impact {
            // Explicit schedules replace the recurrence model; unlisted
            // years stay at zero.
            for (year, impact) in schedule {
                if let Some(t) = year_index(scenario.baseline_year, *year, horizon) {
                    path[t] = sign * impact;
                }
            }
            return path;
        }
    }

    let delta = sign * base_magnitude(action, snapshot, warnings);
    spread(&mut path, delta, action.start_index, action.recurring);
    path
}

/// Percentages on `mission.*` resolve against the mission total and on
/// `cofog.*` against the referenced function, whatever the scenario lens.
fn base_magnitude(
    action: &NormalizedAction<'_>,
    snapshot: &Snapshot,
    warnings: &mut Warnings,
) -> Eur {
    match action.magnitude {
        Magnitude::AmountEur(amount) => amount,
        Magnitude::DeltaPct(pct) => {
            let base = match action.target {
                ResolvedTarget::Piece(piece) => piece.amount_eur,
                ResolvedTarget::Mission(code) => snapshot.mass_baseline(Lens::Admin, code),
                ResolvedTarget::Cofog(code) => snapshot.cofog_baseline(code),
                ResolvedTarget::Tax(code) => snapshot.tax_baseline(code),
                ResolvedTarget::Lever(_) => 0.0,
            };
            if base == 0.0 {
                warnings.push(
                    warnings::WARN_ZERO_BASELINE_AMOUNT,
                    format!("action {}: baseline amount is zero, delta_pct ignored", action.id),
                );
            }
            base * pct / 100.0
        }
        Magnitude::DeltaBps(bps) => {
            let base = match action.target {
                ResolvedTarget::Tax(code) => snapshot.tax_baseline(code),
                _ => 0.0,
            };
            if base == 0.0 {
                warnings.push(
                    warnings::WARN_ZERO_BASELINE_AMOUNT,
                    format!("action {}: tax base is zero, delta_bps ignored", action.id),
                );
            }
            base * bps / BPS_PER_UNIT
        }
        Magnitude::LeverImpact => match action.target {
            ResolvedTarget::Lever(lever) => lever.fixed_impact_eur.unwrap_or_else(|| {
                warnings.push(
                    warnings::WARN_EMPTY_LEVER_IMPACT,
                    format!("lever {} has no catalog impact", lever.id),
                );
                0.0
            }),
            _ => 0.0,
        },
    }
}

/// Categories an offset's shock is spread over in year `t`.
///
/// Revenue offsets act like a tax change. Spending offsets follow that
/// year's specified spending shocks in proportion to their size, so an
/// offset matching an action cancels its macro effect too. With no spending
/// shock that year, a spending offset has no category and no shock.
fn offset_mix(pool: Pool, shocks: &BTreeMap<String, Vec<f64>>, t: usize) -> Vec<(String, f64)> {
    match pool {
        Pool::Revenue => vec![(TAX_CATEGORY.to_string(), 1.0)],
        Pool::Spending => {
            let sizes: Vec<(&String, f64)> = shocks
                .iter()
                .filter(|(category, _)| category.as_str() != TAX_CATEGORY)
                .map(|(category, series)| (category, series[t].abs()))
                .filter(|(_, size)| *size > 0.0)
                .collect();
            let total: f64 = sizes.iter().map(|(_, size)| size).sum();
            sizes
                .into_iter()
                .map(|(category, size)| (category.clone(), size / total))
                .collect()
        }
    }
}

/// Write `delta` at `start` (one-off) or at every year from `start`.
fn spread(path: &mut [Eur], delta: Eur, start: usize, recurring: bool) {
    if recurring {
        for slot in path.iter_mut().skip(start) {
            *slot += delta;
        }
    } else if let Some(slot) = path.get_mut(start) {
        *slot += delta;
    }
}

fn year_index(baseline_year: Year, year: Year, horizon: usize) -> Option<usize> {
    let offset = year - baseline_year;
    (offset >= 0 && (offset as usize) < horizon).then_some(offset as usize)
}

/// Macro categories a target's shock is spread over, with weights.
pub fn shock_categories(target: &ResolvedTarget<'_>, snapshot: &Snapshot) -> Vec<(String, f64)> {
    match target {
        ResolvedTarget::Piece(piece) => {
            if !piece.mapping.cofog.is_empty() {
                piece
                    .mapping
                    .cofog
                    .iter()
                    .map(|c| (c.code.clone(), c.weight))
                    .collect()
            } else if piece.piece_type == PieceType::Revenue {
                vec![(TAX_CATEGORY.to_string(), 1.0)]
            } else {
                Vec::new()
            }
        }
        ResolvedTarget::Lever(lever) => {
            if !lever.cofog_mapping.is_empty() {
                lever
                    .cofog_mapping
                    .iter()
                    .map(|(code, w)| (code.clone(), *w))
                    .collect()
            } else if lever.budget_side == BudgetSide::Revenue {
                vec![(TAX_CATEGORY.to_string(), 1.0)]
            } else {
                lever
                    .mission_mapping
                    .iter()
                    .flat_map(|(mission, w)| {
                        snapshot
                            .bridge
                            .cofogs_for_mission(mission)
                            .into_iter()
                            .map(move |(code, share)| (code, w * share))
                    })
                    .collect()
            }
        }
        ResolvedTarget::Mission(code) => snapshot.bridge.cofogs_for_mission(code),
        ResolvedTarget::Cofog(code) => vec![(code.to_string(), 1.0)],
        ResolvedTarget::Tax(_) => vec![(TAX_CATEGORY.to_string(), 1.0)],
    }
}
