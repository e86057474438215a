//! PRP Collector - ENS/PRP telemetry collection for ESXi hosts
//!
//! Runs the ENS and PRP diagnostic commands on every host of an adapter
//! instance, correlates the results with the vCenter inventory and prints
//! the resulting object set.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{LogFormat, OutputFormat};
use prp_lib::CollectorMetrics;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const COLLECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// PRP/ENS telemetry collector
#[derive(Parser)]
#[command(name = "prp-collector")]
#[command(author, version, about = "PRP/ENS telemetry collector for ESXi hosts", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or JSON); PRP_* environment variables override it
    #[arg(long, short, env = "PRP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum, default_value = "json", global = true)]
    pub log_format: LogFormat,

    /// Write the Prometheus text exposition here after the command
    #[arg(long, global = true)]
    pub metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one collection pass
    Collect {
        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Result format
        #[arg(long, short, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Check SSH connectivity to every host
    Test {
        /// Report format
        #[arg(long, short, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the object-type definition as JSON
    Definition,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Definition = cli.command {
        return commands::definition::run();
    }

    init_tracing(cli.log_format);
    info!(version = COLLECTOR_VERSION, "Starting prp-collector");

    let config = config::CollectorConfig::load(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Collect { output, format } => commands::collect::run(&config, output, format).await,
        Commands::Test { format } => commands::connectivity::run(&config, format).await,
        Commands::Definition => Ok(()),
    };

    if let Some(path) = &cli.metrics_out {
        std::fs::write(path, CollectorMetrics::new().render())
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    if let Err(e) = &outcome {
        output::print_error(&format!("{:#}", e));
    }
    outcome
}
