//! consolidate - canonical issue / enrichment consolidation engine
//!
//! Merges a stream of canonical newspaper issues (JSONL) with a stream of
//! per content item langident/OCRQA enrichments into consolidated canonical
//! issues.
//!
//! # Architecture
//!
//! - The enrichment stream is loaded into an in-memory index first
//! - Issues are then streamed one line at a time and written immediately
//! - Any data error aborts the run; output already written is kept
//!
//! # Modules
//!
//! - `adapters`: Line streams, schema sources, clock
//! - `core`: Consolidation logic (index, consolidators, validator, driver)
//! - `domain`: Record types (Issue, ContentItemMetadata, EnrichmentRecord)
//! - `config`: Config file and override merging
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! consolidate run \
//!     --canonical-input BL-WTCH-1828-issues.jsonl \
//!     --enrichment-input BL-WTCH-1828-langident.jsonl \
//!     -o BL-WTCH-1828-consolidated.jsonl \
//!     --langident-run-id langident-lid-ensemble_multilingual_v2-0-2
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{
    ConsolidationError, EnrichmentIndex, Input, MatchingPolicy, Orchestrator, RunSettings,
    RunSummary, SchemaValidator,
};
pub use domain::{ContentItem, ContentItemMetadata, EnrichmentRecord, Issue};
