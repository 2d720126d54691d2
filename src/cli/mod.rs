//! Command-line interface for consolidate.
//!
//! Provides commands for consolidating canonical issues with their
//! langident/OCRQA enrichments, validating consolidated output, and showing
//! the resolved configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::adapters::{open_reader, open_writer, schema_source_for};
use crate::config::{self, LogLevel, Overrides, ResolvedConfig};
use crate::core::{ConsolidationError, Input, MatchingPolicy, Orchestrator, RunSettings, SchemaValidator};

/// Exit code for data and validation errors
pub const EXIT_DATA_ERROR: u8 = 1;

/// Exit code for every other failure
pub const EXIT_FATAL: u8 = 2;

/// consolidate - merge canonical issues with langident/OCRQA enrichments
#[derive(Parser, Debug)]
#[command(name = "consolidate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .consolidate/config.yaml in this or a parent directory)
    #[arg(long, global = true, env = "CONSOLIDATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, value_enum, env = "CONSOLIDATE_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Write log to FILE
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consolidate canonical issues with enrichments
    Run {
        /// Canonical issue input (JSONL, "-" for stdin)
        #[arg(long)]
        canonical_input: String,

        /// Langident/OCRQA enrichment input (JSONL)
        #[arg(long)]
        enrichment_input: String,

        /// Consolidated canonical output (JSONL, "-" for stdout)
        #[arg(short, long)]
        output: String,

        /// Langident run ID for provenance tracking
        #[arg(long, env = "CONSOLIDATE_RUN_ID")]
        langident_run_id: Option<String>,

        /// What to do with content items that have no enrichment
        #[arg(long, value_enum, env = "CONSOLIDATE_MATCHING")]
        matching: Option<MatchingPolicy>,

        /// Validate every consolidated issue against the schema
        #[arg(long)]
        validate: bool,

        /// Issue schema (path or URL)
        #[arg(long, env = "CONSOLIDATE_SCHEMA")]
        schema: Option<String>,
    },

    /// Validate an already consolidated issue file
    Validate {
        /// Consolidated issue input (JSONL, "-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Issue schema (path or URL)
        #[arg(long, env = "CONSOLIDATE_SCHEMA")]
        schema: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Merge flags, environment and config file
    pub fn resolve_config(&self) -> Result<ResolvedConfig> {
        let mut overrides = Overrides {
            log_level: self.log_level,
            log_file: self.log_file.clone(),
            ..Default::default()
        };

        match &self.command {
            Commands::Run {
                langident_run_id,
                matching,
                validate,
                schema,
                ..
            } => {
                overrides.run_id = langident_run_id.clone();
                overrides.matching = *matching;
                overrides.validate = *validate;
                overrides.schema = schema.clone();
            }
            Commands::Validate { schema, .. } => {
                overrides.validate = true;
                overrides.schema = schema.clone();
            }
            Commands::Config => {}
        }

        config::load(self.config.as_deref(), overrides)
    }

    /// Execute the CLI command
    pub async fn execute(self, config: ResolvedConfig) -> Result<()> {
        match self.command {
            Commands::Run {
                canonical_input,
                enrichment_input,
                output,
                ..
            } => run_consolidation(&config, &canonical_input, &enrichment_input, &output).await,
            Commands::Validate { input, .. } => validate_file(&config, &input).await,
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
        }
    }
}

/// Exit code for a failed run
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConsolidationError>().is_some() {
        EXIT_DATA_ERROR
    } else {
        EXIT_FATAL
    }
}

/// Report a failed run and pick its exit code
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ConsolidationError>() {
        Some(data_error) => {
            error!(kind = data_error.kind(), "{:#}", err);
            eprintln!("[consolidation error: {}] {:#}", data_error.kind(), err);
        }
        None => {
            error!("Processing error: {:#}", err);
            eprintln!("[fatal] {:#}", err);
        }
    }
    ExitCode::from(exit_code_for(err))
}

/// Load the validator if validation is enabled
async fn load_validator(config: &ResolvedConfig) -> Result<Option<SchemaValidator>> {
    match config.schema_location()? {
        Some(location) => {
            let source = schema_source_for(location);
            let validator = SchemaValidator::from_source(source.as_ref()).await?;
            info!("Validating output against schema: {}", validator.origin());
            Ok(Some(validator))
        }
        None => Ok(None),
    }
}

/// Consolidate one canonical file with its enrichments
async fn run_consolidation(
    config: &ResolvedConfig,
    canonical_input: &str,
    enrichment_input: &str,
    output: &str,
) -> Result<()> {
    let settings = config.run_settings()?;
    info!("Langident run ID: {}", settings.run_id);
    info!("Matching policy: {}", settings.matching);

    let mut orchestrator = Orchestrator::new(settings);
    if let Some(validator) = load_validator(config).await? {
        orchestrator = orchestrator.with_validator(validator);
    }

    let enrichment = Input::new(enrichment_input, open_reader(enrichment_input).await?);
    let issues = Input::new(canonical_input, open_reader(canonical_input).await?);
    let writer = open_writer(output).await?;

    let summary = orchestrator.run(enrichment, issues, writer).await?;

    info!(
        issues = summary.issues_written,
        consolidated = summary.content_items_consolidated,
        skipped = summary.content_items_skipped,
        enrichment_records = summary.enrichment_records,
        output = %output,
        "Consolidation finished"
    );
    eprintln!(
        "[consolidated {} issues: {} content items enriched, {} skipped]",
        summary.issues_written, summary.content_items_consolidated, summary.content_items_skipped
    );

    Ok(())
}

/// Validate a consolidated file against the schema
async fn validate_file(config: &ResolvedConfig, input: &str) -> Result<()> {
    let validator = load_validator(config)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No schema configured for validation"))?;

    // Validation only, so the run id is irrelevant here
    let orchestrator = Orchestrator::new(RunSettings {
        run_id: config.run_id.clone().unwrap_or_default(),
        matching: config.matching,
    })
    .with_validator(validator);

    let checked = orchestrator
        .validate_stream(Input::new(input, open_reader(input).await?))
        .await?;

    eprintln!("[{} issues valid]", checked);
    Ok(())
}

/// Print the resolved configuration
fn show_config(config: &ResolvedConfig) {
    println!("Consolidate Configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Run:");
    println!(
        "  Langident run ID: {}",
        config.run_id.as_deref().unwrap_or("(not set)")
    );
    println!("  Matching policy:  {}", config.matching);
    println!();
    println!("Validation:");
    println!("  Enabled: {}", config.validate);
    println!("  Schema:  {}", config.schema.as_deref().unwrap_or("(not set)"));
    println!();
    println!("Logging:");
    println!("  Level: {}", config.log_level.as_filter());
    println!(
        "  File:  {}",
        config
            .log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(stderr only)".to_string())
    );
}
