//! Object-type definition of the collected entity kinds
//!
//! Describes every kind the collector emits with the identifier, property
//! and metric keys the builders attach, so a monitoring framework can
//! validate and display the result set.

use crate::models::ObjectKind;
use crate::parser::{LanCounters, LATENCY_LINES};
use serde::Serialize;

pub const ADAPTER_KIND: &str = "PRPAdapter";
pub const ADAPTER_NAME: &str = "PRP Telemetry";

const LATENCY_LABELS: [&str; 16] = [
    "Total Samples",
    "Minimum Latency",
    "Maximum Latency",
    "Mean",
    "Max",
    "32us",
    "64us",
    "96us",
    "128us",
    "160us",
    "192us",
    "256us",
    "512us",
    "1024us",
    "2048us",
    "4096us",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDefinition {
    pub key: String,
    pub label: String,
}

/// Keys of one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectTypeDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub identifiers: Vec<AttributeDefinition>,
    pub properties: Vec<AttributeDefinition>,
    pub metrics: Vec<AttributeDefinition>,
}

fn attribute(key: impl Into<String>, label: impl Into<String>) -> AttributeDefinition {
    AttributeDefinition {
        key: key.into(),
        label: label.into(),
    }
}

impl ObjectTypeDefinition {
    fn new(kind: ObjectKind, label: &'static str) -> Self {
        Self {
            key: kind.as_str(),
            label,
            identifiers: Vec::new(),
            properties: Vec::new(),
            metrics: Vec::new(),
        }
    }

    fn identifier(mut self, key: &str, label: &str) -> Self {
        self.identifiers.push(attribute(key, label));
        self
    }

    fn property(mut self, key: &str, label: &str) -> Self {
        self.properties.push(attribute(key, label));
        self
    }

    fn metric(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.metrics.push(attribute(key, label));
        self
    }

    fn switch_linkage(self) -> Self {
        self.property("switch_id", "Switch ID")
            .property("switch_uuid", "Switch UUID")
            .property("switch_name", "Switch Name")
    }

    pub fn has_identifier(&self, key: &str) -> bool {
        self.identifiers.iter().any(|a| a.key == key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.iter().any(|a| a.key == key)
    }

    pub fn has_metric(&self, key: &str) -> bool {
        self.metrics.iter().any(|a| a.key == key)
    }
}

/// All collected kinds of the adapter
#[derive(Debug, Clone, Serialize)]
pub struct AdapterDefinition {
    pub adapter_kind: &'static str,
    pub adapter_name: &'static str,
    pub object_types: Vec<ObjectTypeDefinition>,
}

impl AdapterDefinition {
    pub fn object_type(&self, kind: ObjectKind) -> Option<&ObjectTypeDefinition> {
        self.object_types.iter().find(|t| t.key == kind.as_str())
    }
}

fn switch_type() -> ObjectTypeDefinition {
    ObjectTypeDefinition::new(ObjectKind::Switch, "ENS Switch")
        .identifier("uuid", "UUID")
        .property("switch_id", "Switch ID")
        .property("internal_name", "Internal Name")
        .property("switch_uuid", "Switch UUID")
        .property("max_ports", "Max Ports")
        .property("num_active_ports", "Active Ports")
        .property("num_ports", "Ports")
        .property("mtu", "MTU")
        .property("num_lcores", "Lcores")
        .property("lcore_ids", "Lcore IDs")
        .property("esxi_host", "ESXi Server")
        .property("distributed_switch", "Distributed Switch")
}

fn port_type() -> ObjectTypeDefinition {
    let mut port = ObjectTypeDefinition::new(ObjectKind::Port, "Port")
        .identifier("port", "Port")
        .identifier("host", "ESXi Server")
        .property("port_id", "Port ID")
        .property("esxi_host", "ESXi Server")
        .property("mac", "MAC Address")
        .property("vlan_id", "vLAN")
        .property("dv_port", "DV Port")
        .property("uplink", "Uplink")
        .property("vni", "VNI")
        .property("vm", "Virtual Machine")
        .switch_linkage();

    for (prefix, direction) in [("tx", "Transmit"), ("rx", "Received")] {
        for (name, label) in LATENCY_LINES.iter().zip(LATENCY_LABELS) {
            port = port.metric(
                format!("{}_{}", prefix, name),
                format!("{} - {}", label, direction),
            );
        }
    }
    port
}

fn vdan_type() -> ObjectTypeDefinition {
    let mut vdan = ObjectTypeDefinition::new(ObjectKind::Vdan, "vDAN")
        .identifier("vdan", "vDAN")
        .identifier("host", "ESXi Server")
        .identifier("switch_id", "Switch ID")
        .property("vdan_id", "vDAN ID")
        .property("mac", "MAC Address")
        .property("vlan_id", "vLAN")
        .property("fc_port_id", "fc Port ID")
        .property("esxi_host", "ESXi Server")
        .property("vm", "Virtual Machine")
        .switch_linkage()
        .metric("vdan_age", "vDAN Age");

    for side in ["lanA", "lanB"] {
        for (suffix, _) in LanCounters::default().metrics() {
            vdan = vdan.metric(format!("{}_{}", side, suffix), format!("{} {}", side, suffix));
        }
    }
    vdan
}

fn lan_type() -> ObjectTypeDefinition {
    ObjectTypeDefinition::new(ObjectKind::Lan, "LAN")
        .identifier("lan", "LAN")
        .identifier("switch", "Switch UUID")
        .identifier("host", "ESXi Server")
        .identifier("switch_id", "Switch ID")
        .property("lan", "LAN")
        .property("status", "Status")
        .property("uplink1", "Uplink 1")
        .property("uplink2", "Uplink 2")
        .property("policy", "Policy")
        .switch_linkage()
}

fn node_type() -> ObjectTypeDefinition {
    ObjectTypeDefinition::new(ObjectKind::Node, "Node")
        .identifier("uuid", "UUID")
        .property("mac", "MAC Address")
        .property("vlan_id", "vLAN")
        .property("type", "Node Type")
        .property("redbox_mac", "RedBox MAC")
        .property("current_core", "Current Core")
        .property("vdan_mac", "vDAN MAC")
        .switch_linkage()
        .metric("node_age", "Node Age")
        .metric("sup_seq_a", "Supervision Sequence LanA")
        .metric("sup_seq_b", "Supervision Sequence LanB")
}

pub fn adapter_definition() -> AdapterDefinition {
    AdapterDefinition {
        adapter_kind: ADAPTER_KIND,
        adapter_name: ADAPTER_NAME,
        object_types: vec![switch_type(), port_type(), vdan_type(), lan_type(), node_type()],
    }
}
