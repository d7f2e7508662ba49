//! Change detection between the cached value and a fetched candidate.
//!
//! Equality is decided on canonical bytes, not on `PartialEq`: values go
//! through `serde_json::Value`, whose maps are ordered, so field or key order
//! differences between two fetches never register as a change.

use serde::Serialize;

use lcp_core::Result;

/// Outcome of comparing a candidate against the current value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// Candidate encodes to the same bytes as the current value.
    Unchanged,
    /// Candidate encodes to null or an empty collection/string.
    Empty,
    /// Candidate differs from the current value.
    Changed,
}

/// Deterministic JSON encoding of `value`.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Returns true for payloads that must never replace cached data.
pub fn is_empty_payload(bytes: &[u8]) -> bool {
    let trimmed = std::str::from_utf8(bytes).map(str::trim).unwrap_or_default();
    matches!(trimmed, "" | "null" | "[]" | "{}" | "\"\"")
}

/// Compares `current` with `candidate`.
pub fn detect<T: Serialize>(current: &T, candidate: &T) -> Result<Change> {
    let old = canonical_bytes(current)?;
    let new = canonical_bytes(candidate)?;

    if is_empty_payload(&new) {
        return Ok(Change::Empty);
    }
    if old == new {
        return Ok(Change::Unchanged);
    }
    Ok(Change::Changed)
}
