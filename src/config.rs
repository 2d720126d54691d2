//! Configuration for consolidation runs.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags and environment variables (CONSOLIDATE_*)
//! 2. Config file (.consolidate/config.yaml, or --config)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .consolidate/config.yaml
//! - Relative paths in the file resolve against the directory holding .consolidate/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::{MatchingPolicy, RunSettings};

/// Directory searched for during config discovery
pub const CONFIG_DIR: &str = ".consolidate";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    pub langident_run_id: Option<String>,
    pub matching: Option<MatchingPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationConfig {
    pub enabled: Option<bool>,
    /// Schema path (relative to the config base) or URL
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<LogLevel>,
    pub file: Option<String>,
}

/// Logging verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Values supplied on the command line (or through env vars)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub run_id: Option<String>,
    pub matching: Option<MatchingPolicy>,
    pub validate: bool,
    pub schema: Option<String>,
    pub log_level: Option<LogLevel>,
    pub log_file: Option<PathBuf>,
}

/// Configuration after merging all sources
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub run_id: Option<String>,
    pub matching: MatchingPolicy,
    pub validate: bool,
    pub schema: Option<String>,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Run settings; the langident run id must be known by now
    pub fn run_settings(&self) -> Result<RunSettings> {
        let run_id = self
            .run_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context("A langident run id is required (--langident-run-id, CONSOLIDATE_RUN_ID or run.langident_run_id)")?;

        Ok(RunSettings {
            run_id: run_id.to_string(),
            matching: self.matching,
        })
    }

    /// Schema location when validation is enabled
    pub fn schema_location(&self) -> Result<Option<&str>> {
        if !self.validate {
            return Ok(None);
        }
        match self.schema.as_deref() {
            Some(schema) => Ok(Some(schema)),
            None => anyhow::bail!("Validation is enabled but no schema location is configured (--schema)"),
        }
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Directory that relative paths in a config file resolve against
fn config_base_dir(config_path: &Path) -> PathBuf {
    let dir = config_path.parent().unwrap_or(Path::new("."));
    if dir.file_name().is_some_and(|name| name == CONFIG_DIR) {
        dir.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

/// Resolve a path that may be relative to the config base
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Resolve a schema location; URLs are left alone
fn resolve_location(base: &Path, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else {
        resolve_path(base, location).display().to_string()
    }
}

/// Merge overrides over an optional config file
fn merge(file: Option<(PathBuf, ConfigFile)>, overrides: Overrides) -> ResolvedConfig {
    let (config_file, run, validation, logging, base) = match file {
        Some((path, config)) => {
            let base = config_base_dir(&path);
            (Some(path), config.run, config.validation, config.logging, base)
        }
        None => (
            None,
            RunConfig::default(),
            ValidationConfig::default(),
            LoggingConfig::default(),
            PathBuf::from("."),
        ),
    };

    let schema = overrides
        .schema
        .or_else(|| validation.schema.map(|s| resolve_location(&base, &s)));

    ResolvedConfig {
        run_id: overrides.run_id.or(run.langident_run_id),
        matching: overrides.matching.or(run.matching).unwrap_or_default(),
        validate: overrides.validate || validation.enabled.unwrap_or(false),
        schema,
        log_level: overrides.log_level.or(logging.level).unwrap_or_default(),
        log_file: overrides
            .log_file
            .or_else(|| logging.file.map(|f| resolve_path(&base, &f))),
        config_file,
    }
}

/// Load configuration from all sources.
///
/// An explicit config path must exist; otherwise discovery starts from the
/// current directory and a missing file just means defaults.
pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<ResolvedConfig> {
    let config_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| find_config_file(&cwd)),
    };

    let file = match config_path {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(merge(file, overrides))
}
