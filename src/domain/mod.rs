//! Domain types for the consolidation engine.
//!
//! This module contains the record shapes read from and written to the
//! JSON Lines streams:
//! - Issue: canonical issue with its content items
//! - ContentItemMetadata: the per-item unit of consolidation
//! - EnrichmentRecord: langident/OCRQA data for one content item

pub mod enrichment;
pub mod issue;

// Re-export commonly used types
pub use enrichment::EnrichmentRecord;
pub use issue::{ContentItem, ContentItemMetadata, Issue};

use serde_json::Value;

/// Serde helper for fields where "present but null" differs from "absent".
///
/// Use with `#[serde(default, deserialize_with = "present::deserialize",
/// skip_serializing_if = "Option::is_none")]` on an `Option<Value>`; a JSON
/// `null` becomes `Some(Value::Null)`.
pub(crate) mod present {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Some)
    }
}

/// True when a string carries no content (empty or whitespace-only)
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// True for blank strings and empty lists; other values always count as content
pub(crate) fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_blank(s),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Drop an optional field when it is blank
pub(crate) fn prune_blank(field: &mut Option<Value>) -> bool {
    if field.as_ref().is_some_and(is_blank_value) {
        *field = None;
        return true;
    }
    false
}
