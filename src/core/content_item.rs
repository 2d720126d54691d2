//! Content item consolidation.
//!
//! Attaches langident/OCRQA results to one content item's metadata. What
//! happens when no enrichment exists for an item is decided by the
//! [`MatchingPolicy`] chosen when the consolidator is built.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::issue::TYPE_IMAGE;
use crate::domain::{ContentItem, ContentItemMetadata};

use super::error::ConsolidationError;
use super::index::EnrichmentIndex;

/// How to treat a content item with no enrichment record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchingPolicy {
    /// Missing enrichment aborts the run
    Strict,

    /// Missing enrichment is logged and the item passes through unchanged
    #[default]
    Flexible,
}

impl MatchingPolicy {
    /// Outcome for a non-image item that has no enrichment record
    pub fn on_missing(
        self,
        content_item_type: Option<&str>,
        content_item_id: &str,
        issue_id: &str,
    ) -> Result<ContentItemOutcome, ConsolidationError> {
        match self {
            Self::Strict => Err(ConsolidationError::MissingEnrichment {
                content_item_id: content_item_id.to_string(),
                issue_id: issue_id.to_string(),
            }),
            Self::Flexible => {
                warn!(
                    "Missing enrichment data for content item: {} (type: {}). Skipping consolidation for this item.",
                    content_item_id,
                    content_item_type.unwrap_or("unknown")
                );
                Ok(ContentItemOutcome::SkippedUnmatched)
            }
        }
    }
}

impl std::fmt::Display for MatchingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Flexible => write!(f, "flexible"),
        }
    }
}

/// What happened to one content item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentItemOutcome {
    /// Consolidated fields were attached
    Consolidated,

    /// Images are never enriched
    SkippedImage,

    /// No enrichment record (flexible policy only)
    SkippedUnmatched,
}

/// Consolidates content item metadata against an enrichment index
#[derive(Debug, Clone, Copy)]
pub struct ContentItemConsolidator<'a> {
    index: &'a EnrichmentIndex,
    run_id: &'a str,
    policy: MatchingPolicy,
}

impl<'a> ContentItemConsolidator<'a> {
    pub fn new(index: &'a EnrichmentIndex, run_id: &'a str, policy: MatchingPolicy) -> Self {
        Self {
            index,
            run_id,
            policy,
        }
    }

    /// Consolidate a whole content item.
    ///
    /// Items without metadata are left alone and yield `None`. An item-level
    /// `tp` stands in for a missing `m.tp`.
    pub fn consolidate_item(
        &self,
        item: &mut ContentItem,
        issue_id: &str,
    ) -> Result<Option<ContentItemOutcome>, ConsolidationError> {
        let ContentItem { m, extra } = item;
        let Some(metadata) = m.as_mut() else {
            return Ok(None);
        };
        let item_type = extra.get("tp").and_then(Value::as_str);

        self.consolidate_typed(metadata, item_type, issue_id).map(Some)
    }

    /// Consolidate one content item's metadata in place.
    ///
    /// `issue_id` is only used for messages.
    pub fn consolidate(
        &self,
        metadata: &mut ContentItemMetadata,
        issue_id: &str,
    ) -> Result<ContentItemOutcome, ConsolidationError> {
        self.consolidate_typed(metadata, None, issue_id)
    }

    fn consolidate_typed(
        &self,
        metadata: &mut ContentItemMetadata,
        fallback_type: Option<&str>,
        issue_id: &str,
    ) -> Result<ContentItemOutcome, ConsolidationError> {
        let ci_id = match metadata.id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => {
                return Err(ConsolidationError::missing_field(
                    "id",
                    format!("content item of issue {}", issue_id),
                ))
            }
        };

        let pruned = metadata.prune_optional_fields();
        if pruned > 0 {
            debug!(content_item = %ci_id, pruned, "Pruned blank optional fields");
        }

        if let Some(key) = metadata.rename_legacy_language() {
            debug!("Renamed {} → lg_original for {}", key, ci_id);
        }

        let item_type = metadata.tp.as_deref().or(fallback_type);
        if item_type == Some(TYPE_IMAGE) {
            debug!("Skipping consolidation for image content item: {}", ci_id);
            return Ok(ContentItemOutcome::SkippedImage);
        }

        let Some(enrichment) = self.index.get(&ci_id) else {
            return self.policy.on_missing(item_type, &ci_id, issue_id);
        };

        // lg and ocrqa are always written, null when the record lacks them
        metadata.consolidated_lg = Some(enrichment.lg.clone().unwrap_or(Value::Null));
        metadata.consolidated_ocrqa = Some(enrichment.ocrqa.clone().unwrap_or(Value::Null));
        metadata.consolidated_char_len = enrichment.len.clone();
        metadata.consolidated_langident_run_id = Some(self.run_id.to_string());

        Ok(ContentItemOutcome::Consolidated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnrichmentRecord;
    use serde_json::json;

    const RUN_ID: &str = "langident-lid-ensemble_multilingual_v2-0-2";

    fn index() -> EnrichmentIndex {
        vec![
            EnrichmentRecord {
                id: Some("ci-1".to_string()),
                lg: Some(json!("fr")),
                ocrqa: Some(json!(0.92)),
                ..Default::default()
            },
            EnrichmentRecord {
                id: Some("ci-3".to_string()),
                lg: None,
                ocrqa: Some(json!(0.1)),
                len: Some(json!(42)),
                ..Default::default()
            },
        ]
        .into_iter()
        .collect()
    }

    fn metadata(value: serde_json::Value) -> ContentItemMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_consolidates_matched_item() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Flexible);
        let mut m = metadata(json!({"id": "ci-1", "tp": "article", "lg": "en"}));

        let outcome = consolidator.consolidate(&mut m, "iss-1").unwrap();
        assert_eq!(outcome, ContentItemOutcome::Consolidated);

        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "ci-1",
                "tp": "article",
                "lg_original": "en",
                "consolidated_lg": "fr",
                "consolidated_ocrqa": 0.92,
                "consolidated_langident_run_id": RUN_ID,
            })
        );
    }

    #[test]
    fn test_null_language_and_char_len() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Strict);
        let mut m = metadata(json!({"id": "ci-3", "tp": "ad"}));

        consolidator.consolidate(&mut m, "iss-1").unwrap();

        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["consolidated_lg"], serde_json::Value::Null);
        assert_eq!(value["consolidated_char_len"], json!(42));
        assert!(value.get("lg_original").is_none());
    }

    #[test]
    fn test_legacy_l_key_renamed() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Flexible);
        let mut m = metadata(json!({"id": "ci-1", "tp": "article", "l": "de"}));

        consolidator.consolidate(&mut m, "iss-1").unwrap();
        assert_eq!(m.lg_original, Some(json!("de")));
        assert_eq!(m.l, None);
    }

    #[test]
    fn test_no_language_key_no_rename() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Flexible);
        let mut m = metadata(json!({"id": "ci-1", "tp": "article"}));

        consolidator.consolidate(&mut m, "iss-1").unwrap();
        assert_eq!(m.lg_original, None);
    }

    #[test]
    fn test_image_renamed_but_not_enriched() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Strict);
        let mut m = metadata(json!({"id": "ci-1", "tp": "image", "lg": "fr"}));

        let outcome = consolidator.consolidate(&mut m, "iss-1").unwrap();
        assert_eq!(outcome, ContentItemOutcome::SkippedImage);
        assert_eq!(m.lg_original, Some(json!("fr")));
        assert!(!m.is_consolidated());
    }

    #[test]
    fn test_blank_title_pruned() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Flexible);

        let mut blank = metadata(json!({"id": "ci-1", "tp": "article", "t": ""}));
        consolidator.consolidate(&mut blank, "iss-1").unwrap();
        assert!(serde_json::to_value(&blank).unwrap().get("t").is_none());

        let mut titled = metadata(json!({"id": "ci-1", "tp": "article", "t": "Headline"}));
        consolidator.consolidate(&mut titled, "iss-1").unwrap();
        assert_eq!(titled.t, Some(json!("Headline")));
    }

    #[test]
    fn test_missing_ocrqa_written_as_null() {
        let index: EnrichmentIndex = vec![
            EnrichmentRecord {
                id: Some("ci-4".to_string()),
                lg: Some(json!("fr")),
                ocrqa: Some(serde_json::Value::Null),
                ..Default::default()
            },
            EnrichmentRecord {
                id: Some("ci-5".to_string()),
                lg: Some(json!("de")),
                ..Default::default()
            },
        ]
        .into_iter()
        .collect();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Strict);

        for id in ["ci-4", "ci-5"] {
            let mut m = metadata(json!({"id": id, "tp": "article"}));
            consolidator.consolidate(&mut m, "iss-1").unwrap();

            let value = serde_json::to_value(&m).unwrap();
            let object = value.as_object().unwrap();
            assert_eq!(object.get("consolidated_ocrqa"), Some(&serde_json::Value::Null));
            assert!(!object.contains_key("consolidated_char_len"));
        }
    }

    #[test]
    fn test_item_level_image_type_skips_enrichment() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Strict);
        let mut item: ContentItem =
            serde_json::from_value(json!({"tp": "image", "m": {"id": "ci-9", "lg": "fr"}})).unwrap();

        let outcome = consolidator.consolidate_item(&mut item, "iss-1").unwrap();
        assert_eq!(outcome, Some(ContentItemOutcome::SkippedImage));
        assert_eq!(item.m.unwrap().lg_original, Some(json!("fr")));
    }

    #[test]
    fn test_item_without_metadata_untouched() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Strict);
        let mut item: ContentItem = serde_json::from_value(json!({"tp": "page"})).unwrap();
        let before = item.clone();

        assert_eq!(consolidator.consolidate_item(&mut item, "iss-1").unwrap(), None);
        assert_eq!(item, before);
    }

    #[test]
    fn test_flexible_passes_unmatched_through() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Flexible);
        let mut m = metadata(json!({"id": "ci-2", "tp": "article"}));
        let before = m.clone();

        let outcome = consolidator.consolidate(&mut m, "iss-1").unwrap();
        assert_eq!(outcome, ContentItemOutcome::SkippedUnmatched);
        assert_eq!(m, before);
    }

    #[test]
    fn test_strict_rejects_unmatched() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Strict);
        let mut m = metadata(json!({"id": "ci-2", "tp": "article"}));

        let err = consolidator.consolidate(&mut m, "iss-1").unwrap_err();
        match err {
            ConsolidationError::MissingEnrichment {
                content_item_id,
                issue_id,
            } => {
                assert_eq!(content_item_id, "ci-2");
                assert_eq!(issue_id, "iss-1");
            }
            other => panic!("Expected MissingEnrichment, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_id_rejected() {
        let index = index();
        let consolidator = ContentItemConsolidator::new(&index, RUN_ID, MatchingPolicy::Flexible);
        let mut m = metadata(json!({"tp": "article"}));

        let err = consolidator.consolidate(&mut m, "iss-1").unwrap_err();
        assert!(matches!(
            err,
            ConsolidationError::MissingRequiredField { field: "id", .. }
        ));
    }

    #[test]
    fn test_policy_parses_from_yaml() {
        let policy: MatchingPolicy = serde_yaml::from_str("strict").unwrap();
        assert_eq!(policy, MatchingPolicy::Strict);
        assert_eq!(MatchingPolicy::default(), MatchingPolicy::Flexible);
    }
}
