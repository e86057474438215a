//! Per-host collection state machine
//!
//! Drives one host from `Connecting` to `Done`, merging into the shared
//! correlator after every step. Any channel or connection failure moves the
//! host to `Failed`; whatever was merged before stays in the master
//! collections.

use super::registry::{HostRegistry, HostState};
use super::run::CollectionSettings;
use crate::builder::{BuiltEntity, EntityBuilder};
use crate::channel::{ChannelConnector, CommandChannel};
use crate::correlator::{TopologyCorrelator, VmDirectory};
use crate::error::HostError;
use crate::inventory::InventoryProvider;
use crate::models::{HostFailure, HostRef};
use crate::observability::{CollectorMetrics, StructuredLogger};
use crate::parser::{
    commands, parse_instance_list, parse_latency_dump, parse_node_list, parse_prp_config,
    parse_switch_list, parse_vdan_list,
};
use crate::resolver::{HostResolution, ResolvedSwitch};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How one host's collection ended
#[derive(Debug, Clone, PartialEq)]
pub enum HostOutcome {
    /// Collected; carries the number of redundancy switches processed
    Done(usize),
    Failed(HostFailure),
}

/// Collects one host at a time into a shared correlator
pub struct HostCollector {
    connector: Arc<dyn ChannelConnector>,
    inventory: Arc<dyn InventoryProvider>,
    correlator: Arc<Mutex<TopologyCorrelator>>,
    registry: Arc<HostRegistry>,
    settings: CollectionSettings,
    metrics: CollectorMetrics,
    logger: StructuredLogger,
}

impl HostCollector {
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        inventory: Arc<dyn InventoryProvider>,
        correlator: Arc<Mutex<TopologyCorrelator>>,
        registry: Arc<HostRegistry>,
        settings: CollectionSettings,
    ) -> Self {
        let logger = StructuredLogger::new(&settings.instance_id);
        Self {
            connector,
            inventory,
            correlator,
            registry,
            settings,
            metrics: CollectorMetrics::new(),
            logger,
        }
    }

    /// Run the state machine for one host
    pub async fn collect(&self, host: &HostRef) -> HostOutcome {
        let start = Instant::now();
        self.enter(host, HostState::Connecting);

        let result = match self.open_channel(host).await {
            Ok(channel) => {
                let result = self.run_steps(host, channel.as_ref()).await;
                if let Err(e) = channel.close().await {
                    debug!(host = %host.name, error = %e, "Failed to close channel");
                }
                result
            }
            Err(e) => Err(e),
        };

        self.metrics
            .observe_host_collection(start.elapsed().as_secs_f64());

        match result {
            Ok(switches) => {
                self.registry.mark_done(&host.name, switches);
                self.logger.log_host_state(&host.name, HostState::Done.as_str());
                self.metrics.inc_hosts_collected();
                HostOutcome::Done(switches)
            }
            Err(e) => {
                let reason = e.to_string();
                let state = self
                    .registry
                    .mark_failed(&host.name, &reason)
                    .unwrap_or(HostState::Connecting);
                self.logger
                    .log_host_failed(&host.name, state.as_str(), &reason);
                self.metrics.inc_hosts_failed();
                HostOutcome::Failed(HostFailure {
                    host: host.name.clone(),
                    state: state.to_string(),
                    reason,
                })
            }
        }
    }

    fn enter(&self, host: &HostRef, state: HostState) {
        if self.registry.transition(&host.name, state) {
            self.logger.log_host_state(&host.name, state.as_str());
        }
    }

    async fn open_channel(&self, host: &HostRef) -> Result<Box<dyn CommandChannel>, HostError> {
        let address = self
            .inventory
            .host_property(host, &self.settings.management_address_property)
            .await?
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| HostError::NoAddress(host.name.clone()))?;

        debug!(host = %host.name, address = %address, "Connecting");
        Ok(self.connector.connect(&address).await?)
    }

    /// Execute one command; a non-zero exit status is logged and the output still parsed
    async fn run(
        &self,
        host: &HostRef,
        channel: &dyn CommandChannel,
        command: &str,
        label: &'static str,
    ) -> Result<String, HostError> {
        self.metrics.inc_command(label);
        match channel.execute(command, self.settings.command_timeout).await {
            Ok(output) => {
                if !output.success() {
                    warn!(
                        host = %host.name,
                        command,
                        exit_status = output.exit_status,
                        stderr = %output.stderr.trim(),
                        "Command exited with non-zero status, parsing output anyway"
                    );
                }
                Ok(output.stdout)
            }
            Err(e) => {
                self.metrics.inc_command_failed(label);
                Err(e.into())
            }
        }
    }

    async fn run_steps(&self, host: &HostRef, channel: &dyn CommandChannel) -> Result<usize, HostError> {
        self.enter(host, HostState::Discovering);
        let output = self
            .run(host, channel, commands::ENS_SWITCH_LIST, commands::ENS_SWITCH_LIST)
            .await?;
        let ens = parse_switch_list(&output);
        self.metrics
            .add_parse_errors(commands::ENS_SWITCH_LIST, ens.errors.len());

        let output = self
            .run(
                host,
                channel,
                commands::VSWITCH_INSTANCE_LIST,
                commands::VSWITCH_INSTANCE_LIST,
            )
            .await?;
        let instances = parse_instance_list(&output);
        self.metrics
            .add_parse_errors(commands::VSWITCH_INSTANCE_LIST, instances.errors.len());

        let resolution =
            HostResolution::resolve(&ens.records, &instances, &self.settings.client_name_delimiter);
        let redundancy: Vec<ResolvedSwitch> = resolution
            .redundancy_switches(&self.settings.redundancy_marker)
            .cloned()
            .collect();
        if redundancy.is_empty() {
            info!(
                host = %host.name,
                switches = ens.records.len(),
                "No redundancy switches on host"
            );
            return Ok(0);
        }
        let builder = EntityBuilder::new(host, &resolution);

        self.enter(host, HostState::CollectingSwitches);
        let switches: Vec<BuiltEntity> = redundancy
            .iter()
            .filter_map(|s| builder.build_switch(s))
            .collect();
        self.correlator.lock().await.merge_switches(host, switches);

        self.enter(host, HostState::CollectingPortsAndVdans);
        let output = self
            .run(host, channel, commands::LATENCY_DUMP, commands::LATENCY_DUMP)
            .await?;
        let latency = parse_latency_dump(&output);
        self.metrics
            .add_parse_errors(commands::LATENCY_DUMP, latency.errors.len());
        let ports: Vec<BuiltEntity> = latency
            .records
            .iter()
            .map(|l| builder.build_port(l, instances.port(l.port_id)))
            .collect();

        let mut vms = self.vm_directory(host).await;
        self.disambiguate(&mut vms, &ports).await;
        self.correlator.lock().await.merge_ports(host, ports, &vms);

        for switch in &redundancy {
            let id = switch.switch_id();
            let output = self
                .run(host, channel, &commands::vdan_list(id), commands::VDAN_LIST)
                .await?;
            let rows = parse_vdan_list(&output);
            self.metrics
                .add_parse_errors(commands::VDAN_LIST, rows.errors.len());
            let vdans: Vec<BuiltEntity> = rows
                .records
                .iter()
                .map(|row| builder.build_vdan(id, row))
                .collect();
            self.disambiguate(&mut vms, &vdans).await;
            self.correlator.lock().await.merge_vdans(host, vdans, &vms);
        }

        self.enter(host, HostState::CollectingLansAndNodes);
        for switch in &redundancy {
            let id = switch.switch_id();
            let output = self
                .run(host, channel, &commands::prp_config(id), commands::PRP_CONFIG)
                .await?;
            let config = parse_prp_config(&output);
            let lans = builder.build_lans(config.switch_id.or(Some(id)), &config);
            self.correlator.lock().await.merge_lans(host, lans);

            let output = self
                .run(host, channel, &commands::node_list(id), commands::NODE_LIST)
                .await?;
            let rows = parse_node_list(&output);
            self.metrics
                .add_parse_errors(commands::NODE_LIST, rows.errors.len());
            let nodes: Vec<BuiltEntity> = rows
                .records
                .iter()
                .filter_map(|row| builder.build_node(id, row))
                .collect();
            self.correlator.lock().await.merge_nodes(host, nodes);
        }

        Ok(redundancy.len())
    }

    /// VMs on the host; an inventory failure skips VM correlation for this host
    async fn vm_directory(&self, host: &HostRef) -> VmDirectory {
        match self
            .inventory
            .vms_by_host(&self.settings.instance_id, &host.name)
            .await
        {
            Ok(by_name) => VmDirectory::new(by_name),
            Err(e) => {
                warn!(host = %host.name, error = %e, "VM lookup failed, skipping VM correlation");
                VmDirectory::default()
            }
        }
    }

    /// Ask the inventory which VM owns the MAC for every ambiguous VM name
    async fn disambiguate(&self, vms: &mut VmDirectory, built: &[BuiltEntity]) {
        for joins in built.iter().map(|b| &b.joins) {
            let (Some(name), Some(mac)) = (joins.vm_name.as_deref(), joins.mac.as_deref()) else {
                continue;
            };
            if !vms.is_ambiguous(name) || vms.select(name, Some(mac)).is_some() {
                continue;
            }
            match self.inventory.vm_moid_by_mac(name, mac).await {
                Ok(Some(moid)) => vms.insert_moid(name, mac, moid),
                Ok(None) => info!(vm = %name, mac = %mac, "No VM owns MAC among duplicates"),
                Err(e) => warn!(vm = %name, mac = %mac, error = %e, "VM MAC lookup failed"),
            }
        }
    }
}
