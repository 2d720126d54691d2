//! Pipeline driver.
//!
//! Builds the enrichment index once, then streams issues one line at a time
//! through the issue consolidator and the optional schema validator, writing
//! each result as soon as it is ready. The first fatal error stops the run;
//! lines already written stay written.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, instrument};

use crate::adapters::{Clock, SystemClock};
use crate::domain::Issue;

use super::content_item::{ContentItemConsolidator, MatchingPolicy};
use super::error::ConsolidationError;
use super::index::EnrichmentIndex;
use super::issue::IssueConsolidator;
use super::validation::{SchemaValidator, ValidationContext};

/// A named line stream
pub struct Input<R> {
    /// Location used in messages (path, URL, "-")
    pub name: String,
    pub reader: R,
}

impl<R: AsyncBufRead + Unpin> Input<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

/// Settings that stay fixed for a whole run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Langident run that produced the enrichment batch
    pub run_id: String,
    pub matching: MatchingPolicy,
}

/// Totals for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub enrichment_records: usize,
    pub duplicate_enrichment_ids: usize,
    pub issues_written: usize,
    pub content_items_consolidated: usize,
    pub content_items_skipped: usize,
}

/// Consolidation driver
pub struct Orchestrator {
    settings: RunSettings,
    clock: Box<dyn Clock>,
    validator: Option<SchemaValidator>,
}

impl Orchestrator {
    /// Create a driver using the wall clock and no validation
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            clock: Box::new(SystemClock),
            validator: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Validate every consolidated issue before it is written
    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Full run: load enrichments, then consolidate the issue stream
    #[instrument(skip_all, fields(run_id = %self.settings.run_id, matching = %self.settings.matching))]
    pub async fn run<E, I, W>(&self, enrichment: Input<E>, issues: Input<I>, output: W) -> Result<RunSummary>
    where
        E: AsyncBufRead + Unpin,
        I: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Starting consolidation process");
        info!(canonical = %issues.name, enrichment = %enrichment.name, "Inputs");

        let index = EnrichmentIndex::build(enrichment.reader, &enrichment.name).await?;
        let mut summary = self.consolidate_stream(&index, issues, output).await?;
        summary.enrichment_records = index.len();
        summary.duplicate_enrichment_ids = index.duplicates_overridden();

        info!("Successfully processed {} issues", summary.issues_written);
        Ok(summary)
    }

    /// Consolidate an issue stream against an already built index
    pub async fn consolidate_stream<I, W>(
        &self,
        index: &EnrichmentIndex,
        issues: Input<I>,
        mut output: W,
    ) -> Result<RunSummary>
    where
        I: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let consolidator = IssueConsolidator::new(
            ContentItemConsolidator::new(index, &self.settings.run_id, self.settings.matching),
            self.clock.as_ref(),
        );

        let mut summary = RunSummary::default();
        let result = self
            .write_issues(&consolidator, issues, &mut output, &mut summary)
            .await;

        // Lines written before a failure are kept
        output.flush().await.context("Failed to flush output")?;
        result?;

        Ok(summary)
    }

    async fn write_issues<I, W>(
        &self,
        consolidator: &IssueConsolidator<'_>,
        issues: Input<I>,
        output: &mut W,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = issues.reader.lines();
        let mut line_num = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read canonical input: {}", issues.name))?
        {
            line_num += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut issue: Issue = serde_json::from_str(line)
                .map_err(|e| ConsolidationError::from_parse(&issues.name, line_num, e))?;

            let report = consolidator.consolidate(&mut issue)?;

            if let Some(validator) = &self.validator {
                let value = serde_json::to_value(&issue).context("Failed to serialize issue")?;
                validator.validate(
                    &value,
                    &ValidationContext {
                        source_name: issues.name.clone(),
                        line: line_num,
                    },
                )?;
            }

            let json = serde_json::to_string(&issue).context("Failed to serialize issue")?;
            output
                .write_all(format!("{}\n", json).as_bytes())
                .await
                .context("Failed to write consolidated issue")?;

            summary.issues_written += 1;
            summary.content_items_consolidated += report.consolidated;
            summary.content_items_skipped += report.skipped;
        }

        Ok(())
    }

    /// Check an already consolidated stream against the schema.
    ///
    /// Returns the number of issues checked. Without a validator every issue
    /// only has to parse.
    #[instrument(skip_all, fields(input = %issues.name))]
    pub async fn validate_stream<I>(&self, issues: Input<I>) -> Result<usize>
    where
        I: AsyncBufRead + Unpin,
    {
        let mut lines = issues.reader.lines();
        let mut line_num = 0;
        let mut checked = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read input: {}", issues.name))?
        {
            line_num += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| ConsolidationError::from_parse(&issues.name, line_num, e))?;

            if let Some(validator) = &self.validator {
                validator.validate(
                    &value,
                    &ValidationContext {
                        source_name: issues.name.clone(),
                        line: line_num,
                    },
                )?;
            }
            checked += 1;
        }

        info!("Validated {} issues", checked);
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn orchestrator(matching: MatchingPolicy) -> Orchestrator {
        Orchestrator::new(RunSettings {
            run_id: "run-1".to_string(),
            matching,
        })
        .with_clock(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()))
    }

    fn output_lines(output: &[u8]) -> Vec<Value> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_issues_written_in_order() {
        let enrichment = b"{\"id\":\"a-i1\",\"lg\":\"de\",\"ocrqa\":0.5}\n";
        let issues = b"{\"id\":\"a\",\"ts\":\"2024-01-01 00:00:00\",\"i\":[{\"m\":{\"id\":\"a-i1\",\"tp\":\"article\"}}]}\n\n{\"id\":\"b\",\"ts\":\"2024-01-02 00:00:00\"}\n";
        let mut output = Vec::new();

        let summary = orchestrator(MatchingPolicy::Flexible)
            .run(
                Input::new("enrichment.jsonl", &enrichment[..]),
                Input::new("issues.jsonl", &issues[..]),
                &mut output,
            )
            .await
            .unwrap();

        assert_eq!(summary.issues_written, 2);
        assert_eq!(summary.content_items_consolidated, 1);
        assert_eq!(summary.enrichment_records, 1);

        let lines = output_lines(&output);
        assert_eq!(lines[0]["id"], json!("a"));
        assert_eq!(lines[1]["id"], json!("b"));
        assert_eq!(lines[1]["ts"], json!("2025-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_malformed_issue_stops_run_after_earlier_output() {
        let enrichment = b"{\"id\":\"x\"}\n";
        let issues = b"{\"id\":\"a\",\"ts\":\"2024-01-01 00:00:00\"}\n{broken\n{\"id\":\"c\",\"ts\":\"2024-01-01 00:00:00\"}\n";
        let mut output = Vec::new();

        let err = orchestrator(MatchingPolicy::Flexible)
            .run(
                Input::new("enrichment.jsonl", &enrichment[..]),
                Input::new("issues.jsonl", &issues[..]),
                &mut output,
            )
            .await
            .unwrap_err();

        match err.downcast_ref::<ConsolidationError>() {
            Some(ConsolidationError::MalformedInput { line, .. }) => assert_eq!(*line, 2),
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
        assert_eq!(output_lines(&output).len(), 1);
    }

    #[tokio::test]
    async fn test_validate_stream_counts_issues() {
        let validator = SchemaValidator::compile(&json!({"type": "object", "required": ["consolidated"]}), "inline").unwrap();
        let orchestrator = orchestrator(MatchingPolicy::Flexible).with_validator(validator);

        let input = b"{\"id\":\"a\",\"consolidated\":true}\n\n{\"id\":\"b\",\"consolidated\":true}\n";
        let checked = orchestrator
            .validate_stream(Input::new("out.jsonl", &input[..]))
            .await
            .unwrap();
        assert_eq!(checked, 2);

        let input = b"{\"id\":\"a\",\"consolidated\":true}\n{\"id\":\"b\"}\n";
        let err = orchestrator
            .validate_stream(Input::new("out.jsonl", &input[..]))
            .await
            .unwrap_err();
        match err.downcast_ref::<ConsolidationError>() {
            Some(ConsolidationError::ValidationFailure(diagnostic)) => {
                assert_eq!(diagnostic.location, "out.jsonl line 2");
                assert_eq!(diagnostic.issue_id, "b");
            }
            other => panic!("Expected ValidationFailure, got {:?}", other),
        }
    }
}
