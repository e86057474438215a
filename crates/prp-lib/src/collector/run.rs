//! Collection pass coordinator
//!
//! Resolves the hosts of one adapter instance, fetches the run-wide
//! inventory maps, then drives every host through [`HostCollector`] with at
//! most `max_parallel_hosts` in flight.

use super::host::{HostCollector, HostOutcome};
use super::registry::HostRegistry;
use crate::channel::ChannelConnector;
use crate::correlator::{TopologyCorrelator, VlanMap};
use crate::error::CollectError;
use crate::inventory::InventoryProvider;
use crate::models::{CollectResult, HostRef, ObjectKind};
use crate::observability::{CollectorMetrics, StructuredLogger};
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Settings of one collection pass
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    /// Adapter instance whose hosts are collected
    pub instance_id: String,
    /// Friendly-name marker of redundancy switches (default: `-PRP`)
    pub redundancy_marker: String,
    /// Suffix delimiter cut from client names (default: `.eth`)
    pub client_name_delimiter: String,
    /// Host property holding the management address
    pub management_address_property: String,
    /// Per-command timeout (default: 60 seconds)
    pub command_timeout: Duration,
    /// Hosts collected concurrently (default: 1)
    pub max_parallel_hosts: usize,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            instance_id: String::new(),
            redundancy_marker: "-PRP".to_string(),
            client_name_delimiter: ".eth".to_string(),
            management_address_property: "net|mgmt_address".to_string(),
            command_timeout: Duration::from_secs(60),
            max_parallel_hosts: 1,
        }
    }
}

/// Connectivity check result for one host
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityReport {
    pub host: String,
    pub address: Option<String>,
    pub reachable: bool,
    pub error: Option<String>,
}

/// Runs collection passes over every host of an adapter instance
pub struct RunCoordinator {
    connector: Arc<dyn ChannelConnector>,
    inventory: Arc<dyn InventoryProvider>,
    settings: CollectionSettings,
    metrics: CollectorMetrics,
    logger: StructuredLogger,
}

impl RunCoordinator {
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        inventory: Arc<dyn InventoryProvider>,
        settings: CollectionSettings,
    ) -> Self {
        let logger = StructuredLogger::new(&settings.instance_id);
        Self {
            connector,
            inventory,
            settings,
            metrics: CollectorMetrics::new(),
            logger,
        }
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    async fn hosts(&self) -> Result<Vec<HostRef>, CollectError> {
        let hosts = self.inventory.resolve_hosts(&self.settings.instance_id).await?;
        if hosts.is_empty() {
            return Err(CollectError::NoHosts(self.settings.instance_id.clone()));
        }
        Ok(hosts)
    }

    /// One full collection pass
    pub async fn run(&self) -> Result<CollectResult, CollectError> {
        let started_at = Utc::now().timestamp();
        let start = Instant::now();

        let hosts = self.hosts().await?;
        let parallel = self.settings.max_parallel_hosts.max(1);
        self.logger.log_run_started(hosts.len(), parallel);

        let vlans = match self.inventory.vlan_port_groups(&self.settings.instance_id).await {
            Ok(vlans) => vlans,
            Err(e) => {
                warn!(error = %e, "VLAN port-group lookup failed, skipping VLAN correlation");
                VlanMap::new()
            }
        };
        let distributed_switches = match self
            .inventory
            .distributed_switches(&self.settings.instance_id)
            .await
        {
            Ok(switches) => switches,
            Err(e) => {
                warn!(error = %e, "Distributed switch lookup failed, skipping switch correlation");
                HashMap::new()
            }
        };
        debug!(
            vlans = vlans.len(),
            distributed_switches = distributed_switches.len(),
            "Loaded inventory maps"
        );

        let correlator = Arc::new(Mutex::new(TopologyCorrelator::new(vlans, distributed_switches)));
        let registry = Arc::new(HostRegistry::new(&self.settings.instance_id));
        for host in &hosts {
            registry.register(host.clone());
        }

        let collector = Arc::new(HostCollector::new(
            Arc::clone(&self.connector),
            Arc::clone(&self.inventory),
            Arc::clone(&correlator),
            Arc::clone(&registry),
            self.settings.clone(),
        ));
        let permits = Arc::new(Semaphore::new(parallel));
        let mut tasks = JoinSet::new();

        // Permits are taken in inventory order before spawning, so hosts start in that order
        for host in hosts {
            let collector = Arc::clone(&collector);
            let permit = Arc::clone(&permits).acquire_owned().await.ok();
            tasks.spawn(async move {
                let _permit = permit;
                collector.collect(&host).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(HostOutcome::Done(switches)) => debug!(switches, "Host task finished"),
                Ok(HostOutcome::Failed(failure)) => {
                    debug!(host = %failure.host, "Host task failed")
                }
                Err(e) => warn!(error = %e, "Host task aborted"),
            }
        }

        let merged = std::mem::take(&mut *correlator.lock().await);
        let mut result = merged.into_result();
        result.started_at = started_at;
        result.finished_at = Utc::now().timestamp();
        result.hosts_collected = registry.collected();
        result.failed_hosts = registry.failures();

        self.record_entities(&result);
        self.logger.log_run_finished(
            result.hosts_collected.len(),
            result.failed_hosts.len(),
            result.entity_count(),
            start.elapsed().as_millis(),
        );
        Ok(result)
    }

    fn record_entities(&self, result: &CollectResult) {
        for (kind, count) in [
            (ObjectKind::Switch, result.switches.len()),
            (ObjectKind::Port, result.ports.len()),
            (ObjectKind::Node, result.nodes.len()),
            (ObjectKind::Vdan, result.vdans.len()),
            (ObjectKind::Lan, result.lans.len()),
        ] {
            self.metrics.set_entities(kind.as_str(), count);
        }
    }

    /// Open and close one channel per host without running commands
    pub async fn test_connectivity(&self) -> Result<Vec<ConnectivityReport>, CollectError> {
        let hosts = self.hosts().await?;
        let mut reports = Vec::with_capacity(hosts.len());

        for host in hosts {
            let address = match self
                .inventory
                .host_property(&host, &self.settings.management_address_property)
                .await
            {
                Ok(address) => address.filter(|a| !a.trim().is_empty()),
                Err(e) => {
                    reports.push(ConnectivityReport {
                        host: host.name,
                        address: None,
                        reachable: false,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let Some(addr) = address.clone() else {
                reports.push(ConnectivityReport {
                    host: host.name,
                    address,
                    reachable: false,
                    error: Some("no management address".to_string()),
                });
                continue;
            };

            let report = match self.connector.connect(&addr).await {
                Ok(channel) => {
                    if let Err(e) = channel.close().await {
                        debug!(host = %host.name, error = %e, "Failed to close channel");
                    }
                    info!(host = %host.name, address = %addr, "Host reachable");
                    ConnectivityReport {
                        host: host.name,
                        address,
                        reachable: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(host = %host.name, address = %addr, error = %e, "Host unreachable");
                    ConnectivityReport {
                        host: host.name,
                        address,
                        reachable: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }

        Ok(reports)
    }
}

/// Builder for a [`RunCoordinator`]
pub struct RunCoordinatorBuilder {
    connector: Option<Arc<dyn ChannelConnector>>,
    inventory: Option<Arc<dyn InventoryProvider>>,
    settings: CollectionSettings,
}

impl RunCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            connector: None,
            inventory: None,
            settings: CollectionSettings::default(),
        }
    }

    pub fn connector(mut self, connector: Arc<dyn ChannelConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn InventoryProvider>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn settings(mut self, settings: CollectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.settings.instance_id = instance_id.into();
        self
    }

    pub fn redundancy_marker(mut self, marker: impl Into<String>) -> Self {
        self.settings.redundancy_marker = marker.into();
        self
    }

    pub fn max_parallel_hosts(mut self, hosts: usize) -> Self {
        self.settings.max_parallel_hosts = hosts;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.settings.command_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<RunCoordinator> {
        let connector = self
            .connector
            .ok_or_else(|| anyhow::anyhow!("Command channel connector is required"))?;
        let inventory = self
            .inventory
            .ok_or_else(|| anyhow::anyhow!("Inventory provider is required"))?;
        if self.settings.max_parallel_hosts == 0 {
            anyhow::bail!("max_parallel_hosts must be at least 1");
        }

        Ok(RunCoordinator::new(connector, inventory, self.settings))
    }
}

impl Default for RunCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
