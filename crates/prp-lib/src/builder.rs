//! Entity construction from resolved command records
//!
//! Every builder is pure: it turns one record into an [`Entity`] with its
//! properties, metrics and provisional parent edges, plus the join keys the
//! topology correlator needs later. A record lacking an identity field is
//! dropped with a logged reason.

use crate::models::{Entity, HostRef, ObjectKey, ObjectKind, UNKNOWN};
use crate::parser::{LanConfig, NodeRow, PortLatency, PortRow, PrpConfig, VdanRow};
use crate::resolver::{HostResolution, ResolvedSwitch};
use tracing::info;

/// Keys used by the correlator to attach cross-domain relationships
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinKeys {
    pub vlan_id: Option<u16>,
    /// Owning switch UUID, `None` when unresolved
    pub switch_uuid: Option<String>,
    /// Resolved client (VM) name
    pub vm_name: Option<String>,
    pub mac: Option<String>,
    /// VDAN MAC reported for a node
    pub vdan_mac: Option<String>,
}

/// An entity together with its join keys
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltEntity {
    pub entity: Entity,
    pub joins: JoinKeys,
}

impl BuiltEntity {
    fn new(entity: Entity, joins: JoinKeys) -> Self {
        Self { entity, joins }
    }
}

/// Object key of a resolved switch
pub fn switch_key(switch: &ResolvedSwitch) -> ObjectKey {
    ObjectKey::new(ObjectKind::Switch, &switch.friendly_name).with_identifier("uuid", &switch.uuid)
}

fn resolved_uuid(uuid: &str) -> Option<String> {
    (uuid != UNKNOWN).then(|| uuid.to_string())
}

/// Builds entities for one host from its resolution
pub struct EntityBuilder<'a> {
    host: &'a HostRef,
    resolution: &'a HostResolution,
}

impl<'a> EntityBuilder<'a> {
    pub fn new(host: &'a HostRef, resolution: &'a HostResolution) -> Self {
        Self { host, resolution }
    }

    fn switch_parent(&self, switch_id: u32) -> Option<ObjectKey> {
        self.resolution
            .switch(switch_id)
            .filter(|s| s.is_resolved())
            .map(switch_key)
    }

    /// Build a Switch; unresolved switches have no global identity and are dropped
    pub fn build_switch(&self, switch: &ResolvedSwitch) -> Option<BuiltEntity> {
        if !switch.is_resolved() {
            info!(
                host = %self.host.name,
                switch_id = switch.switch_id(),
                "Dropping switch without UUID"
            );
            return None;
        }

        let ens = &switch.ens;
        let mut entity = Entity::new(switch_key(switch))
            .with_property("switch_id", ens.switch_id)
            .with_property("internal_name", ens.name.as_str())
            .with_property("switch_uuid", switch.uuid.as_str())
            .with_property("max_ports", ens.max_ports)
            .with_property("num_active_ports", ens.num_active_ports)
            .with_property("num_ports", ens.num_ports)
            .with_property("mtu", ens.mtu)
            .with_property("num_lcores", ens.num_lcores)
            .with_property("lcore_ids", ens.lcore_ids.as_str())
            .with_property("esxi_host", self.host.name.as_str());
        entity.add_parent(self.host.key());

        Some(BuiltEntity::new(
            entity,
            JoinKeys {
                switch_uuid: Some(switch.uuid.clone()),
                ..Default::default()
            },
        ))
    }

    /// Build a Port from its latency block and, when present, its instance-list row
    pub fn build_port(&self, latency: &PortLatency, row: Option<&PortRow>) -> BuiltEntity {
        let port_id = latency.port_id.to_string();
        let key = ObjectKey::new(ObjectKind::Port, format!("PortID: {}", port_id))
            .with_identifier("port", &port_id)
            .with_identifier("host", &self.host.name);

        let mut entity = Entity::new(key)
            .with_property("port_id", latency.port_id)
            .with_property("esxi_host", self.host.name.as_str());
        for (name, value) in latency.metrics() {
            entity.metrics.insert(name, value);
        }
        entity.add_parent(self.host.key());

        let mut joins = JoinKeys::default();
        if let Some(row) = row {
            entity.set_property("mac", row.mac.as_str());
            entity.set_property("vlan_id", row.vlan_id);
            entity.set_property("dv_port", row.dv_port.as_str());
            entity.set_property("uplink", if row.uplink { "true" } else { "false" });
            entity.set_property("vni", row.vni);
            joins.vlan_id = Some(row.vlan_id);
            joins.mac = Some(row.mac.clone());

            if let Some(client) = self.resolution.client_name(&row.mac) {
                entity.set_property("vm", client);
                joins.vm_name = Some(client.to_string());
            }

            match self.resolution.port_switch(row) {
                Some(sw) => {
                    entity.set_property("switch_id", sw.switch_id());
                    entity.set_property("switch_uuid", sw.uuid.as_str());
                    entity.set_property("switch_name", sw.friendly_name.as_str());
                    joins.switch_uuid = resolved_uuid(&sw.uuid);
                    if sw.is_resolved() {
                        entity.add_parent(switch_key(sw));
                    }
                }
                None => {
                    entity.set_property("switch_uuid", UNKNOWN);
                }
            }
        }

        BuiltEntity::new(entity, joins)
    }

    /// Build a Vdan reported by the switch with the given ID
    pub fn build_vdan(&self, switch_id: u32, row: &VdanRow) -> BuiltEntity {
        let index = row.index.to_string();
        let key = ObjectKey::new(ObjectKind::Vdan, &index)
            .with_identifier("vdan", &index)
            .with_identifier("host", &self.host.name)
            .with_identifier("switch_id", switch_id.to_string());
        let (uuid, name) = self.resolution.switch_linkage(switch_id);

        let mut entity = Entity::new(key)
            .with_property("vdan_id", row.index)
            .with_property("mac", row.mac.as_str())
            .with_property("vlan_id", row.vlan_id)
            .with_property("fc_port_id", row.fc_port_id)
            .with_property("esxi_host", self.host.name.as_str())
            .with_property("switch_id", switch_id)
            .with_property("switch_uuid", uuid.as_str())
            .with_property("switch_name", name.as_str())
            .with_metric("vdan_age", row.age as f64);

        for (suffix, value) in row.lan_a.metrics() {
            entity.metrics.insert(format!("lanA_{}", suffix), value as f64);
        }
        if let Some(lan_b) = &row.lan_b {
            for (suffix, value) in lan_b.metrics() {
                entity.metrics.insert(format!("lanB_{}", suffix), value as f64);
            }
        }

        entity.add_parent(self.host.key());
        if let Some(parent) = self.switch_parent(switch_id) {
            entity.add_parent(parent);
        }

        let vm_name = self.resolution.client_name(&row.mac).map(str::to_string);
        if let Some(vm) = &vm_name {
            entity.set_property("vm", vm.as_str());
        }

        BuiltEntity::new(
            entity,
            JoinKeys {
                vlan_id: Some(row.vlan_id),
                switch_uuid: resolved_uuid(&uuid),
                vm_name,
                mac: Some(row.mac.clone()),
                vdan_mac: None,
            },
        )
    }

    /// Build the Lans of one PRP config; `switch_id` is the ID the config belongs to
    pub fn build_lans(&self, switch_id: Option<u32>, config: &PrpConfig) -> Vec<BuiltEntity> {
        let Some(switch_id) = switch_id else {
            info!(
                host = %self.host.name,
                sections = config.lans.len(),
                "Dropping PRP config without a switch ID"
            );
            return Vec::new();
        };

        config
            .lans
            .iter()
            .filter_map(|lan| self.build_lan(switch_id, lan))
            .collect()
    }

    fn build_lan(&self, switch_id: u32, lan: &LanConfig) -> Option<BuiltEntity> {
        let Some(status) = &lan.status else {
            info!(
                host = %self.host.name,
                switch_id,
                lan = lan.side.as_str(),
                "Dropping LAN section without status"
            );
            return None;
        };

        let (uuid, name) = self.resolution.switch_linkage(switch_id);
        let side = lan.side.as_str();
        let mut key = ObjectKey::new(ObjectKind::Lan, format!("{}:{}", side, name))
            .with_identifier("lan", side)
            .with_identifier("switch", &uuid);
        if uuid == UNKNOWN {
            // Unresolved switches are only distinct per host and switch ID
            key = key
                .with_identifier("host", &self.host.name)
                .with_identifier("switch_id", switch_id.to_string());
        }

        let mut entity = Entity::new(key)
            .with_property("lan", side)
            .with_property("status", status.as_str())
            .with_property("switch_id", switch_id)
            .with_property("switch_uuid", uuid.as_str())
            .with_property("switch_name", name.as_str());
        for (field, value) in [
            ("uplink1", &lan.uplink1),
            ("uplink2", &lan.uplink2),
            ("policy", &lan.policy),
        ] {
            if let Some(v) = value {
                entity.set_property(field, v.as_str());
            }
        }
        entity.add_parent(self.host.key());
        if let Some(parent) = self.switch_parent(switch_id) {
            entity.add_parent(parent);
        }

        Some(BuiltEntity::new(
            entity,
            JoinKeys {
                switch_uuid: resolved_uuid(&uuid),
                ..Default::default()
            },
        ))
    }

    /// Build a Node observed on the switch with the given ID
    pub fn build_node(&self, switch_id: u32, row: &NodeRow) -> Option<BuiltEntity> {
        let Some(mac) = &row.mac else {
            info!(
                host = %self.host.name,
                switch_id,
                index = row.index,
                "Dropping node without MAC"
            );
            return None;
        };

        let (uuid, name) = self.resolution.switch_linkage(switch_id);
        let mut entity = Entity::new(ObjectKey::new(ObjectKind::Node, mac).with_identifier("uuid", mac))
            .with_property("mac", mac.as_str())
            .with_property("switch_id", switch_id)
            .with_property("switch_uuid", uuid.as_str())
            .with_property("switch_name", name.as_str())
            .with_optional_metric("node_age", row.age)
            .with_optional_metric("sup_seq_a", row.sup_seq_a)
            .with_optional_metric("sup_seq_b", row.sup_seq_b);

        if let Some(vlan) = row.vlan_id {
            entity.set_property("vlan_id", vlan);
        }
        for (field, value) in [
            ("type", &row.node_type),
            ("redbox_mac", &row.redbox_mac),
            ("current_core", &row.current_core),
            ("vdan_mac", &row.vdan_mac),
        ] {
            if let Some(v) = value {
                entity.set_property(field, v.as_str());
            }
        }
        entity.add_parent(self.host.key());

        Some(BuiltEntity::new(
            entity,
            JoinKeys {
                vlan_id: row.vlan_id,
                switch_uuid: resolved_uuid(&uuid),
                vm_name: None,
                mac: Some(mac.clone()),
                vdan_mac: row.vdan_mac.clone(),
            },
        ))
    }
}
