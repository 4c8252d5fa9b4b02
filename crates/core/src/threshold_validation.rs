//! Shared range-checking helpers.

use crate::error::CoreError;
use crate::snapshot::PctBounds;

/// Validate a signed percentage change on a piece against its configured
/// `bounds_pct`. Pieces without bounds accept any change.
pub fn validate_pct_bounds(
    piece_id: &str,
    signed_pct: f64,
    bounds: Option<PctBounds>,
) -> Result<(), CoreError> {
    let Some(bounds) = bounds else {
        return Ok(());
    };
    if !(bounds.min..=bounds.max).contains(&signed_pct) {
        return Err(CoreError::BoundsViolation {
            id: piece_id.to_string(),
            delta_pct: signed_pct,
            min: bounds.min,
            max: bounds.max,
        });
    }
    Ok(())
}

/// Whether `value` is zero within `tolerance`.
pub fn is_balanced(value: f64, tolerance: f64) -> bool {
    value.abs() <= tolerance
}
