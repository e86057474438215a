//! Per-host identifier resolution
//!
//! Joins the ENS switch list against the portset headers of the instance list
//! so that a host-local numeric switch ID resolves to the switch UUID and
//! friendly name, and builds the MAC to client-name map used for VM joins.

use crate::models::UNKNOWN;
use crate::parser::{EnsSwitch, InstanceList, PortRow};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// An ENS switch with its UUID and friendly name, or [`UNKNOWN`] for both
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSwitch {
    pub ens: EnsSwitch,
    pub uuid: String,
    pub friendly_name: String,
}

impl ResolvedSwitch {
    pub fn switch_id(&self) -> u32 {
        self.ens.switch_id
    }

    pub fn is_resolved(&self) -> bool {
        self.uuid != UNKNOWN
    }

    /// Whether the switch carries redundancy traffic; an empty marker matches every switch
    pub fn is_redundancy_switch(&self, marker: &str) -> bool {
        marker.is_empty() || (self.is_resolved() && self.friendly_name.contains(marker))
    }
}

/// Identifier maps of one host
#[derive(Debug, Clone, Default)]
pub struct HostResolution {
    switches: BTreeMap<u32, ResolvedSwitch>,
    /// Portset internal name to switch ID
    by_internal_name: HashMap<String, u32>,
    client_by_mac: HashMap<String, String>,
}

impl HostResolution {
    /// Resolve switch IDs and client names from the two discovery outputs
    pub fn resolve(switches: &[EnsSwitch], instances: &InstanceList, client_delimiter: &str) -> Self {
        let mut resolution = HostResolution::default();

        for ens in switches {
            // Name join first; the `DvsPortset-<N>` number is the switch ID otherwise
            let portset = instances.portset(&ens.name).or_else(|| {
                instances
                    .portsets
                    .iter()
                    .find(|p| p.portset_number() == Some(ens.switch_id))
            });

            let resolved = match portset {
                Some(p) => {
                    resolution
                        .by_internal_name
                        .insert(p.internal_name.clone(), ens.switch_id);
                    ResolvedSwitch {
                        ens: ens.clone(),
                        uuid: p.uuid.clone(),
                        friendly_name: p.friendly_name.clone(),
                    }
                }
                None => {
                    info!(
                        switch_id = ens.switch_id,
                        internal_name = %ens.name,
                        "No portset found for ENS switch, linkage is UNKNOWN"
                    );
                    ResolvedSwitch {
                        ens: ens.clone(),
                        uuid: UNKNOWN.to_string(),
                        friendly_name: UNKNOWN.to_string(),
                    }
                }
            };
            resolution.by_internal_name.insert(ens.name.clone(), ens.switch_id);
            resolution.switches.insert(ens.switch_id, resolved);
        }

        for row in &instances.ports {
            if row.mac.is_empty() || row.client.is_empty() {
                continue;
            }
            let client = strip_client_suffix(&row.client, client_delimiter);
            debug!(mac = %row.mac, client = %client, "Resolved client name");
            resolution.client_by_mac.insert(row.mac.clone(), client);
        }

        resolution
    }

    pub fn switch(&self, switch_id: u32) -> Option<&ResolvedSwitch> {
        self.switches.get(&switch_id)
    }

    pub fn switches(&self) -> impl Iterator<Item = &ResolvedSwitch> {
        self.switches.values()
    }

    /// Switches that drive the switch-scoped commands, in switch ID order
    pub fn redundancy_switches<'a>(
        &'a self,
        marker: &'a str,
    ) -> impl Iterator<Item = &'a ResolvedSwitch> + 'a {
        self.switches
            .values()
            .filter(move |s| s.is_redundancy_switch(marker))
    }

    /// `(uuid, friendly name)` of a switch ID, [`UNKNOWN`] when it is not resolved
    pub fn switch_linkage(&self, switch_id: u32) -> (String, String) {
        match self.switches.get(&switch_id) {
            Some(s) => (s.uuid.clone(), s.friendly_name.clone()),
            None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
        }
    }

    /// Switch owning a port row of the instance list
    pub fn port_switch(&self, row: &PortRow) -> Option<&ResolvedSwitch> {
        self.by_internal_name
            .get(&row.internal_name)
            .and_then(|id| self.switches.get(id))
    }

    pub fn client_name(&self, mac: &str) -> Option<&str> {
        self.client_by_mac
            .get(&mac.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn client_count(&self) -> usize {
        self.client_by_mac.len()
    }
}

/// Cut a client name at the last occurrence of the delimiter
///
/// `plc-01.eth0` with delimiter `.eth` becomes `plc-01`. A name without the
/// delimiter, or an empty delimiter, is kept whole.
pub fn strip_client_suffix(client: &str, delimiter: &str) -> String {
    if delimiter.is_empty() {
        return client.trim().to_string();
    }
    match client.rfind(delimiter) {
        Some(pos) if pos > 0 => client[..pos].trim().to_string(),
        _ => client.trim().to_string(),
    }
}
