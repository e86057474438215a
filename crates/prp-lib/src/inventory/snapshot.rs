//! Inventory served from a JSON snapshot file
//!
//! Used for offline collection runs and in tests.

use super::InventoryProvider;
use crate::correlator::VlanMap;
use crate::error::InventoryError;
use crate::models::{DistributedSwitchRef, HostRef, PortGroupRef, VmRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotHost {
    pub name: String,
    pub resource_id: String,
    pub moid: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotVm {
    pub name: String,
    pub moid: String,
    pub parent_host: String,
    #[serde(default)]
    pub macs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotPortGroup {
    pub name: String,
    pub moid: String,
    pub switch_uuid: String,
    pub vlan_id: Option<u16>,
}

/// Serialized inventory document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub hosts: Vec<SnapshotHost>,
    #[serde(default)]
    pub vms: Vec<SnapshotVm>,
    #[serde(default)]
    pub distributed_switches: Vec<DistributedSwitchRef>,
    #[serde(default)]
    pub port_groups: Vec<SnapshotPortGroup>,
}

/// Inventory provider over an in-memory snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotInventory {
    snapshot: InventorySnapshot,
}

impl SnapshotInventory {
    pub fn new(snapshot: InventorySnapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| InventoryError::Decode(format!("{}: {}", path.display(), e)))?;
        let snapshot = serde_json::from_str(&text)
            .map_err(|e| InventoryError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl InventoryProvider for SnapshotInventory {
    async fn resolve_hosts(&self, _instance_id: &str) -> Result<Vec<HostRef>, InventoryError> {
        Ok(self
            .snapshot
            .hosts
            .iter()
            .map(|h| HostRef {
                name: h.name.clone(),
                resource_id: h.resource_id.clone(),
                moid: h.moid.clone(),
            })
            .collect())
    }

    async fn host_property(&self, host: &HostRef, key: &str) -> Result<Option<String>, InventoryError> {
        Ok(self
            .snapshot
            .hosts
            .iter()
            .find(|h| h.resource_id == host.resource_id)
            .and_then(|h| h.properties.get(key).cloned()))
    }

    async fn vms_by_host(
        &self,
        _instance_id: &str,
        host_name: &str,
    ) -> Result<HashMap<String, Vec<VmRef>>, InventoryError> {
        let mut by_name: HashMap<String, Vec<VmRef>> = HashMap::new();
        for vm in self.snapshot.vms.iter().filter(|vm| vm.parent_host == host_name) {
            by_name.entry(vm.name.clone()).or_default().push(VmRef {
                name: vm.name.clone(),
                moid: vm.moid.clone(),
            });
        }
        Ok(by_name)
    }

    async fn distributed_switches(
        &self,
        _instance_id: &str,
    ) -> Result<HashMap<String, DistributedSwitchRef>, InventoryError> {
        Ok(self
            .snapshot
            .distributed_switches
            .iter()
            .map(|s| (s.uuid.clone(), s.clone()))
            .collect())
    }

    async fn vlan_port_groups(&self, _instance_id: &str) -> Result<VlanMap, InventoryError> {
        let mut vlans = VlanMap::new();
        for pg in &self.snapshot.port_groups {
            let Some(vlan) = pg.vlan_id else {
                continue;
            };
            vlans.entry(vlan).or_default().push(PortGroupRef {
                name: pg.name.clone(),
                moid: pg.moid.clone(),
                switch_uuid: pg.switch_uuid.clone(),
            });
        }
        Ok(vlans)
    }

    async fn vm_moid_by_mac(&self, vm_name: &str, mac: &str) -> Result<Option<String>, InventoryError> {
        Ok(self
            .snapshot
            .vms
            .iter()
            .find(|vm| vm.name == vm_name && vm.macs.iter().any(|m| m.eq_ignore_ascii_case(mac)))
            .map(|vm| vm.moid.clone()))
    }
}
