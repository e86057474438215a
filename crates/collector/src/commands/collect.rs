//! `collect`: one collection pass

use crate::config::CollectorConfig;
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

pub async fn run(config: &CollectorConfig, destination: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let coordinator = super::coordinator(config)?;
    let result = coordinator.run().await.context("Collection pass failed")?;

    let rendered = output::render_result(&result, format)?;
    match destination {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), entities = result.entity_count(), "Result written");
        }
        None => println!("{}", rendered),
    }

    if result.failed_hosts.is_empty() {
        output::print_success(&format!(
            "Collected {} objects from {} hosts",
            result.entity_count(),
            result.hosts_collected.len()
        ));
    } else {
        output::print_warning(&format!(
            "Collected {} objects; {} of {} hosts failed",
            result.entity_count(),
            result.failed_hosts.len(),
            result.failed_hosts.len() + result.hosts_collected.len()
        ));
    }
    Ok(())
}
