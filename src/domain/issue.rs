//! Canonical issue records.
//!
//! An issue is one line of the canonical JSONL stream. Only the keys the
//! consolidation touches are modelled as fields; everything else rides along
//! in `extra` and is written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{present, prune_blank};

/// Content item type tag for images (never enriched)
pub const TYPE_IMAGE: &str = "image";

/// Content item type tag for OLR articles
pub const TYPE_ARTICLE: &str = "article";

/// Content item type tag for whole pages (no OLR)
pub const TYPE_PAGE: &str = "page";

/// One canonical newspaper issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Primary timestamp; overwritten with the processing time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,

    /// Fallback creation timestamp; removed once consolidated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdt: Option<String>,

    /// Optical layout recognition flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub olr: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated: Option<bool>,

    /// Normalized original timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated_ts_original: Option<String>,

    /// Text-style list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<Value>,

    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<Value>,

    /// Media title variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_t: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iiif_manifest_uri: Option<Value>,

    /// Broadcast channel (radio issues)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rc: Option<Value>,

    /// Broadcast program (radio issues)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp: Option<Value>,

    /// Content items, in reading order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i: Option<Vec<ContentItem>>,

    /// Keys not touched by consolidation
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// Remove optional issue-level fields that are null or blank.
    ///
    /// Returns the number of fields removed.
    pub fn prune_optional_fields(&mut self) -> usize {
        [
            &mut self.s,
            &mut self.n,
            &mut self.var_t,
            &mut self.iiif_manifest_uri,
            &mut self.rc,
            &mut self.rp,
        ]
        .into_iter()
        .map(prune_blank)
        .filter(|pruned| *pruned)
        .count()
    }

    /// The timestamp to preserve: `ts`, falling back to `cdt`
    pub fn original_timestamp(&self) -> Option<&str> {
        self.ts
            .as_deref()
            .filter(|ts| !ts.trim().is_empty())
            .or_else(|| self.cdt.as_deref().filter(|cdt| !cdt.trim().is_empty()))
    }

    /// Content items, empty when the issue has no `i` key
    pub fn content_items(&self) -> &[ContentItem] {
        self.i.as_deref().unwrap_or_default()
    }

    pub fn content_items_mut(&mut self) -> &mut [ContentItem] {
        self.i.as_deref_mut().unwrap_or_default()
    }

    /// Type tags of the content items, in order
    pub fn type_tags(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.content_items().iter().map(ContentItem::type_tag)
    }
}

/// One content item within an issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Content item metadata (the unit of consolidation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<ContentItemMetadata>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentItem {
    /// Type tag from the metadata, falling back to an item-level `tp`
    pub fn type_tag(&self) -> Option<&str> {
        self.m
            .as_ref()
            .and_then(|m| m.tp.as_deref())
            .or_else(|| self.extra.get("tp").and_then(Value::as_str))
    }
}

/// Content item metadata, before and after consolidation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Type tag ("article", "page", "image", "ad", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp: Option<String>,

    /// Language as recorded by the canonical importer
    #[serde(
        default,
        deserialize_with = "present::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub lg: Option<Value>,

    /// Legacy single-letter language key
    #[serde(
        default,
        deserialize_with = "present::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub l: Option<Value>,

    #[serde(
        default,
        deserialize_with = "present::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub lg_original: Option<Value>,

    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_link: Option<Value>,

    /// Variant title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_t: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archival_note: Option<Value>,

    #[serde(
        default,
        deserialize_with = "present::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub consolidated_lg: Option<Value>,

    #[serde(
        default,
        deserialize_with = "present::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub consolidated_ocrqa: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated_char_len: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated_langident_run_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentItemMetadata {
    /// Remove optional metadata fields that are null or blank.
    ///
    /// Returns the number of fields removed.
    pub fn prune_optional_fields(&mut self) -> usize {
        [
            &mut self.t,
            &mut self.ext_link,
            &mut self.var_t,
            &mut self.archival_note,
        ]
        .into_iter()
        .map(prune_blank)
        .filter(|pruned| *pruned)
        .count()
    }

    /// Move the legacy language key to `lg_original`.
    ///
    /// `lg` wins over `l`; at most one rename applies. Returns the key that
    /// was moved, if any.
    pub fn rename_legacy_language(&mut self) -> Option<&'static str> {
        if let Some(lg) = self.lg.take() {
            self.lg_original = Some(lg);
            return Some("lg");
        }
        if let Some(l) = self.l.take() {
            self.lg_original = Some(l);
            return Some("l");
        }
        None
    }

    /// Whether consolidated fields have been attached
    pub fn is_consolidated(&self) -> bool {
        self.consolidated_langident_run_id.is_some()
    }
}
