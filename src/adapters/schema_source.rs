//! Schema document sources: local files, HTTP(S) URLs, or an in-memory value.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::SchemaSource;

/// Pick a source for a schema location (URL or filesystem path)
pub fn schema_source_for(location: &str) -> Box<dyn SchemaSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSchemaSource::new(location))
    } else {
        Box::new(FileSchemaSource::new(location))
    }
}

/// Schema stored on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Value> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read schema file: {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schema file: {}", self.path.display()))
    }
}

/// Schema published over HTTP(S)
pub struct HttpSchemaSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSchemaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SchemaSource for HttpSchemaSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Value> {
        debug!(url = %self.url, "Fetching schema");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch schema: {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Schema request rejected: {}", self.url))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse schema from {}", self.url))
    }
}

/// Schema already held in memory
#[derive(Debug, Clone)]
pub struct InlineSchemaSource {
    name: String,
    schema: Value,
}

impl InlineSchemaSource {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

#[async_trait]
impl SchemaSource for InlineSchemaSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn fetch(&self) -> Result<Value> {
        Ok(self.schema.clone())
    }
}
