//! Subcommand handlers

pub mod collect;
pub mod connectivity;
pub mod definition;

use crate::config::CollectorConfig;
use anyhow::{bail, Context, Result};
use prp_lib::channel::SshConnector;
use prp_lib::inventory::{InventoryProvider, SnapshotInventory, SuiteApiInventory};
use prp_lib::{RunCoordinator, RunCoordinatorBuilder};
use std::sync::Arc;
use tracing::info;

/// Inventory provider selected by the configuration
fn inventory(config: &CollectorConfig) -> Result<Arc<dyn InventoryProvider>> {
    if let Some(path) = &config.inventory.snapshot_path {
        info!(path = %path.display(), "Using inventory snapshot");
        let snapshot = SnapshotInventory::from_path(path).context("Failed to load inventory snapshot")?;
        return Ok(Arc::new(snapshot));
    }

    if config.inventory.adapter_instance_id.is_empty() {
        bail!("inventory.adapter_instance_id is required when no snapshot is configured");
    }
    let client = SuiteApiInventory::new(&config.suite_api_settings())
        .context("Failed to create inventory client")?;
    Ok(Arc::new(client))
}

/// Coordinator wired to SSH and the configured inventory
pub fn coordinator(config: &CollectorConfig) -> Result<RunCoordinator> {
    RunCoordinatorBuilder::new()
        .connector(Arc::new(SshConnector::new(config.ssh_settings())))
        .inventory(inventory(config)?)
        .settings(config.collection_settings())
        .build()
}
