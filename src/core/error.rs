//! Data errors raised by consolidation.
//!
//! Every variant aborts the run. I/O and configuration problems are not
//! modelled here; they travel as `anyhow::Error` and map to a different
//! exit code.

use serde_json::error::Category;
use thiserror::Error;

use super::validation::ValidationDiagnostic;

/// Fatal data error
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("Invalid JSON in {source_name} line {line}")]
    MalformedInput {
        source_name: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON whose shape does not fit the record
    #[error("Unexpected record shape in {source_name} line {line}")]
    InvalidRecord {
        source_name: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required field '{field}' in {record}")]
    MissingRequiredField { field: &'static str, record: String },

    #[error("Missing enrichment data for content item {content_item_id} (issue {issue_id})")]
    MissingEnrichment {
        content_item_id: String,
        issue_id: String,
    },

    #[error("No enrichment data loaded from {source_name} - cannot proceed")]
    NoEnrichmentData { source_name: String },

    #[error("Schema validation failed\n{0}")]
    ValidationFailure(Box<ValidationDiagnostic>),
}

impl ConsolidationError {
    /// Classify a line parse failure: syntax errors are malformed input,
    /// type mismatches in otherwise valid JSON are invalid records
    pub fn from_parse(source_name: &str, line: usize, source: serde_json::Error) -> Self {
        let source_name = source_name.to_string();
        match source.classify() {
            Category::Data => Self::InvalidRecord {
                source_name,
                line,
                source,
            },
            Category::Io | Category::Syntax | Category::Eof => Self::MalformedInput {
                source_name,
                line,
                source,
            },
        }
    }

    pub fn missing_field(field: &'static str, record: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field,
            record: record.into(),
        }
    }

    /// Short label used in operator-facing messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput { .. } => "malformed input",
            Self::InvalidRecord { .. } => "invalid record",
            Self::MissingRequiredField { .. } => "missing required field",
            Self::MissingEnrichment { .. } => "missing enrichment",
            Self::NoEnrichmentData { .. } => "no enrichment data",
            Self::ValidationFailure(_) => "validation failure",
        }
    }
}
