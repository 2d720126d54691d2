//! In-memory enrichment lookup keyed by content item id.
//!
//! The whole enrichment stream is loaded before any issue is read. A repeated
//! id silently replaces the earlier record (last write wins).

use std::collections::HashMap;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::domain::EnrichmentRecord;

use super::error::ConsolidationError;

/// Enrichment records by content item id
#[derive(Debug, Default)]
pub struct EnrichmentIndex {
    records: HashMap<String, EnrichmentRecord>,
    duplicates: usize,
}

impl EnrichmentIndex {
    /// Load every non-blank line of an enrichment stream.
    ///
    /// Fails on the first unparseable line or record without an id, and
    /// when the stream holds no records at all.
    pub async fn build<R>(reader: R, source_name: &str) -> Result<Self>
    where
        R: AsyncBufRead + Unpin,
    {
        info!(source = source_name, "Loading enrichments");

        let mut index = Self::default();
        let mut lines = reader.lines();
        let mut line_num = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read enrichment input: {}", source_name))?
        {
            line_num += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: EnrichmentRecord = serde_json::from_str(line)
                .map_err(|e| ConsolidationError::from_parse(source_name, line_num, e))?;

            index.insert(record).map_err(|_| {
                ConsolidationError::missing_field(
                    "id",
                    format!("enrichment {} line {}", source_name, line_num),
                )
            })?;
        }

        if index.is_empty() {
            return Err(ConsolidationError::NoEnrichmentData {
                source_name: source_name.to_string(),
            }
            .into());
        }

        info!(records = index.len(), "Loaded enrichment records");
        Ok(index)
    }

    /// Add a record, replacing any earlier record with the same id.
    ///
    /// Returns the record back if it has no usable id.
    pub fn insert(&mut self, record: EnrichmentRecord) -> Result<(), EnrichmentRecord> {
        let Some(key) = record.key().map(str::to_string) else {
            return Err(record);
        };

        if self.records.insert(key, record).is_some() {
            self.duplicates += 1;
            debug!("Duplicate enrichment id replaced earlier record");
        }
        Ok(())
    }

    pub fn get(&self, content_item_id: &str) -> Option<&EnrichmentRecord> {
        self.records.get(content_item_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that replaced an earlier one with the same id
    pub fn duplicates_overridden(&self) -> usize {
        self.duplicates
    }
}

impl FromIterator<EnrichmentRecord> for EnrichmentIndex {
    /// Records without an id are dropped
    fn from_iter<I: IntoIterator<Item = EnrichmentRecord>>(iter: I) -> Self {
        let mut index = Self::default();
        for record in iter {
            let _ = index.insert(record);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn downcast(err: &anyhow::Error) -> &ConsolidationError {
        err.downcast_ref::<ConsolidationError>()
            .expect("expected a ConsolidationError")
    }

    #[tokio::test]
    async fn test_build_skips_blank_lines() {
        let input = b"{\"id\":\"ci-1\",\"lg\":\"fr\",\"ocrqa\":0.9}\n\n   \n{\"id\":\"ci-2\",\"lg\":\"de\"}\n";
        let index = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("ci-1").unwrap().lg, Some(json!("fr")));
        assert_eq!(index.get("ci-2").unwrap().ocrqa, None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let input = b"{\"id\":\"ci-1\",\"lg\":\"fr\"}\n{\"id\":\"ci-1\",\"lg\":\"lb\"}\n";
        let index = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("ci-1").unwrap().lg, Some(json!("lb")));
        assert_eq!(index.duplicates_overridden(), 1);
    }

    #[tokio::test]
    async fn test_malformed_line_is_fatal() {
        let input = b"{\"id\":\"ci-1\"}\n{not json\n";
        let err = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap_err();

        match downcast(&err) {
            ConsolidationError::MalformedInput { line, .. } => assert_eq!(*line, 2),
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_float_len_is_accepted() {
        let input = b"{\"id\":\"ci-1\",\"len\":12.0,\"systems\":[]}\n";
        let index = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap();

        assert_eq!(index.get("ci-1").unwrap().len, Some(json!(12.0)));
    }

    #[tokio::test]
    async fn test_non_string_id_is_invalid_record() {
        let input = b"{\"id\":\"ci-1\"}\n{\"id\":7}\n";
        let err = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap_err();

        match downcast(&err) {
            ConsolidationError::InvalidRecord { line, .. } => assert_eq!(*line, 2),
            other => panic!("Expected InvalidRecord, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_id_is_fatal() {
        let input = b"{\"lg\":\"fr\"}\n";
        let err = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap_err();

        assert!(matches!(
            downcast(&err),
            ConsolidationError::MissingRequiredField { field: "id", .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_stream_is_fatal() {
        let input = b"\n\n";
        let err = EnrichmentIndex::build(&input[..], "enrichment.jsonl").await.unwrap_err();

        assert!(matches!(
            downcast(&err),
            ConsolidationError::NoEnrichmentData { .. }
        ));
    }

    #[test]
    fn test_from_iter_drops_records_without_id() {
        let index: EnrichmentIndex = vec![
            EnrichmentRecord {
                id: Some("ci-1".to_string()),
                ..Default::default()
            },
            EnrichmentRecord::default(),
        ]
        .into_iter()
        .collect();

        assert_eq!(index.len(), 1);
    }
}
