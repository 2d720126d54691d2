//! Core consolidation logic.
//!
//! This module contains:
//! - EnrichmentIndex: In-memory enrichment lookup
//! - ContentItemConsolidator: Per content item merge under a matching policy
//! - IssueConsolidator: Timestamps, OLR inference, pruning
//! - SchemaValidator: Optional schema check with diagnostics
//! - Orchestrator: Stream driver

pub mod content_item;
pub mod error;
pub mod index;
pub mod issue;
pub mod orchestrator;
pub mod validation;

// Re-export commonly used types
pub use content_item::{ContentItemConsolidator, ContentItemOutcome, MatchingPolicy};
pub use error::ConsolidationError;
pub use index::EnrichmentIndex;
pub use issue::{infer_olr, normalize_timestamp, IssueConsolidator, IssueReport};
pub use orchestrator::{Input, Orchestrator, RunSettings, RunSummary};
pub use validation::{SchemaValidator, ValidationContext, ValidationDiagnostic};
