//! External inventory of hosts, VMs, distributed switches and port-groups
//!
//! The collector never owns inventory data; it asks an [`InventoryProvider`]
//! for the objects it correlates against.

mod snapshot;
mod suite_api;

pub use snapshot::{
    InventorySnapshot, SnapshotHost, SnapshotInventory, SnapshotPortGroup, SnapshotVm,
};
pub use suite_api::{SuiteApiInventory, SuiteApiSettings};

use crate::correlator::VlanMap;
use crate::error::InventoryError;
use crate::models::{DistributedSwitchRef, HostRef, VmRef};
use async_trait::async_trait;
use std::collections::HashMap;

/// vCenter adapter kind of every queried resource
pub const VCENTER_ADAPTER_KIND: &str = "VMWARE";
/// Port-group property holding its VLAN ID
pub const VLAN_ID_PROPERTY: &str = "config|defaultPortConfig|vlan|vlanId";
/// Port-group property holding its distributed switch UUID
pub const PORT_GROUP_SWITCH_PROPERTY: &str = "config|distributedVirtualSwitch|uuid";
/// Distributed switch property holding its UUID
pub const SWITCH_UUID_PROPERTY: &str = "summary|uuid";
/// VM property naming the host it runs on
pub const VM_PARENT_HOST_PROPERTY: &str = "summary|parentHost";
/// Suffix of every VM NIC MAC property
pub const MAC_PROPERTY_SUFFIX: &str = "|macAddress";

/// Read access to the inventory
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Hosts managed by an adapter instance
    async fn resolve_hosts(&self, instance_id: &str) -> Result<Vec<HostRef>, InventoryError>;

    /// One property of a host, `None` when the host does not carry it
    async fn host_property(&self, host: &HostRef, key: &str) -> Result<Option<String>, InventoryError>;

    /// VMs running on a host, grouped by name
    async fn vms_by_host(
        &self,
        instance_id: &str,
        host_name: &str,
    ) -> Result<HashMap<String, Vec<VmRef>>, InventoryError>;

    /// Distributed switches keyed by UUID
    async fn distributed_switches(
        &self,
        instance_id: &str,
    ) -> Result<HashMap<String, DistributedSwitchRef>, InventoryError>;

    /// Port-group candidates keyed by VLAN ID
    async fn vlan_port_groups(&self, instance_id: &str) -> Result<VlanMap, InventoryError>;

    /// Managed object ID of the VM with this name owning a NIC with this MAC
    async fn vm_moid_by_mac(&self, vm_name: &str, mac: &str) -> Result<Option<String>, InventoryError>;
}

/// Parse a VLAN property value; empty, `none` or non-numeric values carry no VLAN
pub fn parse_vlan_id(value: &str) -> Option<u16> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    value.parse().ok()
}
