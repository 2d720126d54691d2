//! consolidate CLI entrypoint

use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use consolidate::cli::{report_failure, Cli, EXIT_FATAL};
use consolidate::config::ResolvedConfig;

/// Initialize tracing: stderr always, plus a plain-text file layer when configured
fn init_tracing(config: &ResolvedConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[fatal] {:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("[fatal] {:#}", e);
        return ExitCode::from(EXIT_FATAL);
    }

    tracing::debug!(?config, "Resolved configuration");

    match cli.execute(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e),
    }
}
