//! Langident/OCRQA enrichment records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enrichment data for one content item, as produced by a langident run.
///
/// Apart from the id, values are carried as found and copied onto the
/// content item without reinterpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    /// Content item identifier (the index key)
    #[serde(default)]
    pub id: Option<String>,

    /// Decided language (may be null)
    #[serde(default)]
    pub lg: Option<Value>,

    /// OCR quality score
    #[serde(default)]
    pub ocrqa: Option<Value>,

    /// Character length (newer enrichment schema versions only)
    #[serde(default)]
    pub len: Option<Value>,

    /// How the language decision was reached
    #[serde(default)]
    pub lg_decision: Option<Value>,

    /// Per-system language scores (a mapping)
    #[serde(default)]
    pub systems: Option<Value>,

    #[serde(default)]
    pub alphabetical_ratio: Option<Value>,
}

impl EnrichmentRecord {
    /// Identifier if present and non-blank
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !super::is_blank(id))
    }
}
