//! Action target references (`piece.<id>`, `lever.<id>`, ...).

use std::sync::LazyLock;

use regex::Regex;

/// Grammar of a target string: a known kind, a dot, a non-empty identifier.
pub const TARGET_PATTERN: &str = r"^(piece|lever|mission|cofog|tax)\.([A-Za-z0-9_.\-]+)$";

pub(crate) static TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TARGET_PATTERN).expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    Piece,
    Lever,
    Mission,
    Cofog,
    Tax,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Piece => "piece",
            Self::Lever => "lever",
            Self::Mission => "mission",
            Self::Cofog => "cofog",
            Self::Tax => "tax",
        })
    }
}

/// A parsed target reference. Identifiers are not yet checked against any
/// snapshot; see [`crate::normalizer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetRef {
    Piece(String),
    Lever(String),
    Mission(String),
    Cofog(String),
    Tax(String),
}

impl TargetRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = TARGET_RE.captures(raw)?;
        let id = caps[2].to_string();
        Some(match &caps[1] {
            "piece" => Self::Piece(id),
            "lever" => Self::Lever(id),
            "mission" => Self::Mission(id),
            "cofog" => Self::Cofog(id),
            _ => Self::Tax(id),
        })
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Piece(_) => TargetKind::Piece,
            Self::Lever(_) => TargetKind::Lever,
            Self::Mission(_) => TargetKind::Mission,
            Self::Cofog(_) => TargetKind::Cofog,
            Self::Tax(_) => TargetKind::Tax,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Piece(id)
            | Self::Lever(id)
            | Self::Mission(id)
            | Self::Cofog(id)
            | Self::Tax(id) => id,
        }
    }
}
