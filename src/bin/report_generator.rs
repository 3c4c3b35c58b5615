//! Cartload Load-Test Report Generator
//!
//! Combines the harness results file and the CloudWatch metric snapshots of a
//! DynamoDB run into a graded JSON report and prints a console summary.

use anyhow::{Context, Result};
use cartload::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "report_generator")]
#[command(about = "Generate a graded report from a Cartload DynamoDB load-test run")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    run(&config).context("Failed to generate report")?;
    Ok(())
}
