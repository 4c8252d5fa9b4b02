//! Deterministic scenario identifiers.

use sha2::{Digest, Sha256};

use crate::scenario::ScenarioDocument;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Stable id of a decoded document.
///
/// Hashes the canonical serialization of the typed document, so whitespace,
/// key order and defaulted fields in the submitted text do not change the
/// id, while any change in content does.
pub fn scenario_id(document: &ScenarioDocument) -> String {
    let canonical = serde_json::to_vec(document).unwrap_or_default();
    sha256_hex(&canonical)
}
