//! Core data models for the PRP topology collector

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sentinel used when a switch linkage cannot be resolved
pub const UNKNOWN: &str = "UNKNOWN";

/// Kind of an object in the topology graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Switch,
    Port,
    Node,
    Vdan,
    Lan,
    /// External: ESXi host from the inventory
    Host,
    /// External: virtual machine from the inventory
    VirtualMachine,
    /// External: distributed port-group from the inventory
    PortGroup,
    /// External: distributed switch from the inventory
    DistributedSwitch,
}

impl ObjectKind {
    /// Whether objects of this kind are produced by the collector itself
    pub fn is_collected(&self) -> bool {
        matches!(
            self,
            ObjectKind::Switch
                | ObjectKind::Port
                | ObjectKind::Node
                | ObjectKind::Vdan
                | ObjectKind::Lan
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Switch => "switch",
            ObjectKind::Port => "port",
            ObjectKind::Node => "node",
            ObjectKind::Vdan => "vdan",
            ObjectKind::Lan => "lan",
            ObjectKind::Host => "HostSystem",
            ObjectKind::VirtualMachine => "VirtualMachine",
            ObjectKind::PortGroup => "DistributedVirtualPortgroup",
            ObjectKind::DistributedSwitch => "VmwareDistributedVirtualSwitch",
        }
    }
}

/// Stable identity of an object: kind, display name and identifier set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub name: String,
    pub identifiers: BTreeMap<String, String>,
}

impl ObjectKey {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            identifiers: BTreeMap::new(),
        }
    }

    /// Add an identifier to the key
    pub fn with_identifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.identifiers.insert(key.into(), value.into());
        self
    }

    pub fn identifier(&self, key: &str) -> Option<&str> {
        self.identifiers.get(key).map(String::as_str)
    }
}

/// A property value attached to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            PropertyValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(_) => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<u16> for PropertyValue {
    fn from(value: u16) -> Self {
        PropertyValue::Number(value as f64)
    }
}

/// One object of the topology graph with its properties, metrics and parents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: ObjectKey,
    pub properties: BTreeMap<String, PropertyValue>,
    pub metrics: BTreeMap<String, f64>,
    pub parents: BTreeSet<ObjectKey>,
}

impl Entity {
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
            metrics: BTreeMap::new(),
            parents: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_string(), value);
        self
    }

    /// Set a metric only when the value is present
    pub fn with_optional_metric(mut self, key: &str, value: Option<u64>) -> Self {
        if let Some(v) = value {
            self.metrics.insert(key.to_string(), v as f64);
        }
        self
    }

    /// Add a parent edge; returns false if the edge already existed
    pub fn add_parent(&mut self, parent: ObjectKey) -> bool {
        self.parents.insert(parent)
    }

    pub fn has_parent(&self, parent: &ObjectKey) -> bool {
        self.parents.contains(parent)
    }

    pub fn property_text(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_text)
    }

    pub fn property_number(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(PropertyValue::as_number)
    }

    /// Parents of a given kind
    pub fn parents_of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &ObjectKey> {
        self.parents.iter().filter(move |p| p.kind == kind)
    }
}

/// ESXi host as resolved from the inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostRef {
    pub name: String,
    /// Inventory resource identifier used for property lookups
    pub resource_id: String,
    /// vCenter managed object ID
    pub moid: String,
}

impl HostRef {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(ObjectKind::Host, &self.name).with_identifier("VMEntityObjectID", &self.moid)
    }
}

/// Virtual machine as resolved from the inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmRef {
    pub name: String,
    pub moid: String,
}

impl VmRef {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(ObjectKind::VirtualMachine, &self.name)
            .with_identifier("VMEntityObjectID", &self.moid)
    }
}

/// Distributed port-group candidate for a VLAN
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortGroupRef {
    pub name: String,
    pub moid: String,
    /// UUID of the distributed switch the port-group belongs to
    pub switch_uuid: String,
}

impl PortGroupRef {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(ObjectKind::PortGroup, &self.name)
            .with_identifier("VMEntityObjectID", &self.moid)
    }
}

/// Distributed switch as known by the inventory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributedSwitchRef {
    pub name: String,
    pub uuid: String,
}

impl DistributedSwitchRef {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(ObjectKind::DistributedSwitch, &self.name).with_identifier("uuid", &self.uuid)
    }
}

/// Why a host did not complete its collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFailure {
    pub host: String,
    /// Orchestrator state the host was in when it failed
    pub state: String,
    pub reason: String,
}

/// Final object set of one collection pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectResult {
    pub started_at: i64,
    pub finished_at: i64,
    pub switches: Vec<Entity>,
    pub ports: Vec<Entity>,
    pub nodes: Vec<Entity>,
    pub vdans: Vec<Entity>,
    pub lans: Vec<Entity>,
    /// Related-node counter per port-group name, for inventory display
    pub port_group_related_nodes: BTreeMap<String, u32>,
    pub hosts_collected: Vec<String>,
    pub failed_hosts: Vec<HostFailure>,
}

impl CollectResult {
    /// All collected entities in emission order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.switches
            .iter()
            .chain(self.ports.iter())
            .chain(self.nodes.iter())
            .chain(self.vdans.iter())
            .chain(self.lans.iter())
    }

    pub fn entity_count(&self) -> usize {
        self.switches.len() + self.ports.len() + self.nodes.len() + self.vdans.len() + self.lans.len()
    }

    /// Flattened (parent, child) relationship edges
    pub fn relationships(&self) -> Vec<(ObjectKey, ObjectKey)> {
        self.entities()
            .flat_map(|e| e.parents.iter().map(move |p| (p.clone(), e.key.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parent_edges_are_sets() {
        let host = HostRef {
            name: "esx-01".to_string(),
            resource_id: "r-1".to_string(),
            moid: "host-10".to_string(),
        };
        let mut entity = Entity::new(ObjectKey::new(ObjectKind::Node, "aa:bb:cc:dd:ee:ff"));

        assert!(entity.add_parent(host.key()));
        assert!(!entity.add_parent(host.key()));
        assert_eq!(entity.parents.len(), 1);
        assert_eq!(entity.parents_of_kind(ObjectKind::Host).count(), 1);
    }

    #[test]
    fn test_optional_metric_is_omitted() {
        let entity = Entity::new(ObjectKey::new(ObjectKind::Port, "PortID: 1"))
            .with_optional_metric("tx_mean", None)
            .with_optional_metric("rx_mean", Some(12));

        assert!(!entity.metrics.contains_key("tx_mean"));
        assert_eq!(entity.metrics.get("rx_mean"), Some(&12.0));
    }

    #[test]
    fn test_property_value_serializes_untagged() {
        let entity = Entity::new(ObjectKey::new(ObjectKind::Switch, "vds-PRP-A"))
            .with_property("mtu", 1500u32)
            .with_property("internal_name", "DvsPortset-0");

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["properties"]["mtu"], 1500.0);
        assert_eq!(json["properties"]["internal_name"], "DvsPortset-0");
    }

    #[test]
    fn test_relationships_flatten_parents() {
        let host = ObjectKey::new(ObjectKind::Host, "esx-01");
        let mut sw = Entity::new(ObjectKey::new(ObjectKind::Switch, "vds-PRP-A"));
        sw.add_parent(host.clone());

        let result = CollectResult {
            switches: vec![sw],
            ..Default::default()
        };

        let edges = result.relationships();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, host);
        assert_eq!(result.entity_count(), 1);
    }
}
