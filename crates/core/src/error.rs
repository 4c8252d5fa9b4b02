use serde::{Deserialize, Serialize};

/// A single schema or semantic violation in a scenario document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Location in the document, e.g. `actions[2].op`.
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed with {} violation(s): {}", .violations.len(), join_violations(.violations))]
    Validation { violations: Vec<Violation> },

    #[error("Unknown {kind} id: {id}")]
    UnknownReference { kind: &'static str, id: String },

    #[error("Piece {id} is locked and cannot be modified")]
    LockedPiece { id: String },

    #[error(
        "delta_pct {delta_pct} on piece {id} is outside bounds_pct [{min}, {max}] percent"
    )]
    BoundsViolation {
        id: String,
        delta_pct: f64,
        min: f64,
        max: f64,
    },

    #[error("Missing baseline: {0}")]
    MissingBaseline(String),
}

impl CoreError {
    /// Shorthand for a validation failure with a single violation.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![Violation::new(path, message)],
        }
    }

    /// Machine-readable error kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::UnknownReference { .. } => "UnknownReferenceError",
            Self::LockedPiece { .. } => "LockedPieceError",
            Self::BoundsViolation { .. } => "BoundsViolationError",
            Self::MissingBaseline(_) => "MissingBaselineError",
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
