//! Adapters for the collaborators outside the consolidation logic.
//!
//! - transport: line-oriented input and output streams
//! - schema_source: where the issue schema document comes from
//! - clock: the processing timestamp

pub mod clock;
pub mod schema_source;
pub mod transport;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use clock::{Clock, FixedClock, SystemClock};
pub use schema_source::{schema_source_for, FileSchemaSource, HttpSchemaSource, InlineSchemaSource};
pub use transport::{open_reader, open_writer, LineReader, LineWriter, STDIO};

/// Trait for anything that can hand over a JSON schema document
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Human-readable location (path or URL)
    fn describe(&self) -> String;

    /// Fetch and parse the schema document
    async fn fetch(&self) -> Result<Value>;
}
