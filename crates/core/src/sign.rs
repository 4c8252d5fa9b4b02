//! Sign resolution: the single place that turns an operation on a target
//! into the sign of its deficit delta.
//!
//! Deficit deltas are positive when the deficit worsens.

use crate::scenario::Op;

/// How a target's amounts relate to the deficit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignKind {
    /// Expenditure piece, mission or COFOG aggregate.
    Spending,
    /// Revenue piece or tax category.
    Revenue,
    /// Catalog lever; its impact is saving-positive.
    Lever,
}

/// Multiplier applied to a non-negative magnitude to obtain a deficit delta.
pub fn deficit_sign(kind: SignKind, op: Op) -> f64 {
    match (kind, op) {
        (SignKind::Spending, Op::Decrease) => -1.0,
        (SignKind::Spending, _) => 1.0,
        (SignKind::Revenue, Op::Decrease) => 1.0,
        (SignKind::Revenue, _) => -1.0,
        (SignKind::Lever, Op::Decrease) => 1.0,
        (SignKind::Lever, _) => -1.0,
    }
}

/// Direction of the requested change relative to the baseline amount, used
/// for bounds checks: `+1` grows the amount, `-1` shrinks it.
pub fn direction(op: Op) -> f64 {
    match op {
        Op::Decrease => -1.0,
        Op::Increase | Op::Activate | Op::Apply => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_increase_worsens_deficit() {
        assert_eq!(deficit_sign(SignKind::Spending, Op::Increase), 1.0);
        assert_eq!(deficit_sign(SignKind::Spending, Op::Apply), 1.0);
        assert_eq!(deficit_sign(SignKind::Spending, Op::Activate), 1.0);
        assert_eq!(deficit_sign(SignKind::Spending, Op::Decrease), -1.0);
    }

    #[test]
    fn revenue_increase_improves_deficit() {
        assert_eq!(deficit_sign(SignKind::Revenue, Op::Increase), -1.0);
        assert_eq!(deficit_sign(SignKind::Revenue, Op::Apply), -1.0);
        assert_eq!(deficit_sign(SignKind::Revenue, Op::Decrease), 1.0);
    }

    #[test]
    fn lever_activation_is_a_saving() {
        assert_eq!(deficit_sign(SignKind::Lever, Op::Activate), -1.0);
        assert_eq!(deficit_sign(SignKind::Lever, Op::Apply), -1.0);
        assert_eq!(deficit_sign(SignKind::Lever, Op::Increase), -1.0);
        assert_eq!(deficit_sign(SignKind::Lever, Op::Decrease), 1.0);
    }

    #[test]
    fn direction_follows_op() {
        assert_eq!(direction(Op::Decrease), -1.0);
        assert_eq!(direction(Op::Increase), 1.0);
    }
}
