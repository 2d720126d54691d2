//! Schema validation of consolidated issues.
//!
//! The schema is fetched once from a [`SchemaSource`] and compiled up front.
//! The first violation of any issue becomes a [`ValidationDiagnostic`] that
//! points at the offending content item when the failure lies inside `i`.

use std::fmt;

use anyhow::{anyhow, Result};
use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::info;

use crate::adapters::SchemaSource;

use super::error::ConsolidationError;

/// Where the validated issue came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    pub source_name: String,
    pub line: usize,
}

/// Structured report of one schema violation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDiagnostic {
    /// Input name and line number
    pub location: String,
    pub issue_id: String,
    /// Index within `i` when the failure is inside a content item
    pub content_item_index: Option<usize>,
    pub content_item_id: Option<String>,
    /// JSON pointer to the failing value
    pub instance_path: String,
    pub message: String,
    pub value: Value,
    /// JSON pointer into the schema
    pub schema_path: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  source:       {}", self.location)?;
        writeln!(f, "  issue:        {}", self.issue_id)?;
        if let Some(index) = self.content_item_index {
            writeln!(
                f,
                "  content item: {} (index {})",
                self.content_item_id.as_deref().unwrap_or("UNKNOWN"),
                index
            )?;
        }
        writeln!(f, "  path:         {}", display_pointer(&self.instance_path))?;
        writeln!(f, "  message:      {}", self.message)?;
        writeln!(f, "  value:        {}", self.value)?;
        write!(f, "  schema path:  {}", display_pointer(&self.schema_path))
    }
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() {
        "(root)"
    } else {
        pointer
    }
}

/// Content item index for instance paths of the form `/i/<n>/...`
fn content_item_index(instance_path: &str) -> Option<usize> {
    let mut segments = instance_path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("i"), Some(index)) => index.parse().ok(),
        _ => None,
    }
}

/// Compiled issue schema
pub struct SchemaValidator {
    schema: JSONSchema,
    origin: String,
}

impl SchemaValidator {
    /// Compile an already-parsed schema document.
    ///
    /// Only local `$ref`s (`#/definitions/...`) are resolved; a schema that
    /// points at remote documents must be bundled first.
    pub fn compile(schema: &Value, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        let compiled = JSONSchema::compile(schema)
            .map_err(|e| anyhow!("Invalid JSON schema from {}: {}", origin, e))?;

        Ok(Self {
            schema: compiled,
            origin,
        })
    }

    /// Fetch the schema from its source and compile it
    pub async fn from_source(source: &dyn SchemaSource) -> Result<Self> {
        let origin = source.describe();
        info!(schema = %origin, "Loading validation schema");

        let schema = source.fetch().await?;
        Self::compile(&schema, origin)
    }

    /// Where the schema was loaded from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Validate one serialized issue, reporting the first violation
    pub fn validate(&self, issue: &Value, context: &ValidationContext) -> Result<(), ConsolidationError> {
        let diagnostic = match self.schema.validate(issue) {
            Ok(()) => return Ok(()),
            Err(mut errors) => match errors.next() {
                Some(error) => {
                    let instance_path = error.instance_path.to_string();
                    let index = content_item_index(&instance_path);

                    ValidationDiagnostic {
                        location: format!("{} line {}", context.source_name, context.line),
                        issue_id: issue
                            .get("id")
                            .and_then(Value::as_str)
                            .unwrap_or("UNKNOWN")
                            .to_string(),
                        content_item_index: index,
                        content_item_id: index.and_then(|i| {
                            issue
                                .pointer(&format!("/i/{}/m/id", i))
                                .and_then(Value::as_str)
                                .map(str::to_string)
                        }),
                        message: error.to_string(),
                        value: error.instance.clone().into_owned(),
                        schema_path: error.schema_path.to_string(),
                        instance_path,
                    }
                }
                None => return Ok(()),
            },
        };

        Err(ConsolidationError::ValidationFailure(Box::new(diagnostic)))
    }
}
