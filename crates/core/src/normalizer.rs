//! Action normalizer: resolves every target of a decoded document against a
//! snapshot and fixes the order in which the engine will see them.
//!
//! After this stage no raw target string is inspected again. Actions and
//! offsets are sorted by id so that every later sum runs in the same order
//! regardless of where an action sat in the submitted document.

use crate::error::CoreError;
use crate::scenario::target::TargetRef;
use crate::scenario::{ApuSubsector, Lens, Op, Pool, Role, ScenarioDocument};
use crate::sign::{self, SignKind};
use crate::snapshot::{BudgetPiece, Lever, PieceType, Snapshot};
use crate::threshold_validation::validate_pct_bounds;
use crate::types::{Eur, Year};

/// A target checked against the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedTarget<'a> {
    Piece(&'a BudgetPiece),
    Lever(&'a Lever),
    Mission(&'a str),
    Cofog(&'a str),
    Tax(&'a str),
}

impl ResolvedTarget<'_> {
    pub fn sign_kind(&self) -> SignKind {
        match self {
            Self::Piece(piece) if piece.piece_type == PieceType::Revenue => SignKind::Revenue,
            Self::Piece(_) | Self::Mission(_) | Self::Cofog(_) => SignKind::Spending,
            Self::Tax(_) => SignKind::Revenue,
            Self::Lever(_) => SignKind::Lever,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Magnitude {
    AmountEur(Eur),
    DeltaPct(f64),
    DeltaBps(f64),
    /// Use the lever's catalog impact.
    LeverImpact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAction<'a> {
    pub id: &'a str,
    pub target: ResolvedTarget<'a>,
    pub op: Op,
    pub magnitude: Magnitude,
    pub recurring: bool,
    pub role: Role,
    /// Index into the horizon of the first affected year.
    pub start_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOffset<'a> {
    pub id: &'a str,
    pub pool: Pool,
    pub amount_eur: Eur,
    pub recurring: bool,
    pub start_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedScenario<'a> {
    pub baseline_year: Year,
    pub years: Vec<Year>,
    pub lens: Lens,
    pub apu_subsector: Option<ApuSubsector>,
    pub actions: Vec<NormalizedAction<'a>>,
    pub offsets: Vec<NormalizedOffset<'a>>,
}

impl NormalizedScenario<'_> {
    pub fn horizon(&self) -> usize {
        self.years.len()
    }
}

/// Resolve a decoded document against a snapshot.
///
/// Fails on the first unknown reference, locked piece or bounds violation,
/// in document order; nothing is partially applied.
pub fn normalize<'a>(
    document: &'a ScenarioDocument,
    snapshot: &'a Snapshot,
) -> Result<NormalizedScenario<'a>, CoreError> {
    snapshot.require_year(document.baseline_year)?;

    let mut actions = document
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let target_ref = TargetRef::parse(&action.target).ok_or_else(|| {
                CoreError::validation(format!("actions[{i}].target"), "unparseable target")
            })?;
            let target = resolve_target(&action.target, &target_ref, snapshot)?;

            if let (ResolvedTarget::Piece(piece), Some(pct)) = (target, action.delta_pct) {
                let signed_pct = sign::direction(action.op) * pct;
                validate_pct_bounds(&piece.id, signed_pct, piece.policy.bounds_pct)?;
            }

            let magnitude = match (action.amount_eur, action.delta_pct, action.delta_bps) {
                (Some(amount), _, _) => Magnitude::AmountEur(amount),
                (_, Some(pct), _) => Magnitude::DeltaPct(pct),
                (_, _, Some(bps)) => Magnitude::DeltaBps(bps),
                (None, None, None) => Magnitude::LeverImpact,
            };

            Ok(NormalizedAction {
                id: action.id.as_str(),
                target,
                op: action.op,
                magnitude,
                recurring: action.recurring,
                role: action.role,
                start_index: start_index(document.baseline_year, action.year),
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;
    actions.sort_by(|a, b| a.id.cmp(b.id));

    let mut offsets: Vec<NormalizedOffset<'a>> = document
        .offsets
        .iter()
        .map(|offset| NormalizedOffset {
            id: offset.id.as_str(),
            pool: offset.pool,
            amount_eur: offset.amount_eur,
            recurring: offset.recurring,
            start_index: start_index(document.baseline_year, offset.year),
        })
        .collect();
    offsets.sort_by(|a, b| a.id.cmp(b.id));

    tracing::debug!(
        actions = actions.len(),
        offsets = offsets.len(),
        "Scenario normalized",
    );

    Ok(NormalizedScenario {
        baseline_year: document.baseline_year,
        years: document.years(),
        lens: document.assumptions.lens,
        apu_subsector: document.assumptions.apu_subsector,
        actions,
        offsets,
    })
}

fn resolve_target<'a>(
    raw: &'a str,
    target: &TargetRef,
    snapshot: &'a Snapshot,
) -> Result<ResolvedTarget<'a>, CoreError> {
    // Borrow the identifier from the document rather than the parsed copy.
    let id = &raw[raw.len() - target.id().len()..];
    match target {
        TargetRef::Piece(_) => {
            let piece = snapshot.piece(id).ok_or_else(|| unknown("piece", id))?;
            if piece.policy.locked_default {
                return Err(CoreError::LockedPiece {
                    id: piece.id.clone(),
                });
            }
            Ok(ResolvedTarget::Piece(piece))
        }
        TargetRef::Lever(_) => snapshot
            .lever(id)
            .map(ResolvedTarget::Lever)
            .ok_or_else(|| unknown("lever", id)),
        TargetRef::Mission(_) if snapshot.has_mission(id) => Ok(ResolvedTarget::Mission(id)),
        TargetRef::Mission(_) => Err(unknown("mission", id)),
        TargetRef::Cofog(_) if snapshot.has_cofog(id) => Ok(ResolvedTarget::Cofog(id)),
        TargetRef::Cofog(_) => Err(unknown("cofog", id)),
        TargetRef::Tax(_) => Ok(ResolvedTarget::Tax(id)),
    }
}

fn unknown(kind: &'static str, id: &str) -> CoreError {
    CoreError::UnknownReference {
        kind,
        id: id.to_string(),
    }
}

fn start_index(baseline_year: Year, year: Option<Year>) -> usize {
    year.map(|y| (y - baseline_year).max(0) as usize).unwrap_or(0)
}
