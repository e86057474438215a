//! Topology correlation across hosts
//!
//! The correlator owns the master collections of one collection pass. Each
//! host merges its built entities step by step, so a host that fails midway
//! leaves everything it merged before the failure in place. All merges take
//! `&mut self`; concurrent hosts share the correlator behind one mutex.

use crate::builder::{BuiltEntity, JoinKeys};
use crate::models::{
    CollectResult, DistributedSwitchRef, Entity, HostRef, ObjectKey, PortGroupRef, VmRef,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Port-group candidates per VLAN ID
pub type VlanMap = HashMap<u16, Vec<PortGroupRef>>;

/// VM lookup data of one host
#[derive(Debug, Clone, Default)]
pub struct VmDirectory {
    by_name: HashMap<String, Vec<VmRef>>,
    /// Inventory answers for ambiguous names, keyed by `(vm name, mac)`
    moid_by_name_mac: HashMap<(String, String), String>,
}

impl VmDirectory {
    pub fn new(by_name: HashMap<String, Vec<VmRef>>) -> Self {
        Self {
            by_name,
            moid_by_name_mac: HashMap::new(),
        }
    }

    pub fn candidates(&self, name: &str) -> &[VmRef] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the name maps to more than one VM
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.candidates(name).len() > 1
    }

    /// Record which VM owns a NIC MAC for an ambiguous name
    pub fn insert_moid(&mut self, name: &str, mac: &str, moid: impl Into<String>) {
        self.moid_by_name_mac
            .insert((name.to_string(), mac.to_ascii_lowercase()), moid.into());
    }

    /// Pick the VM for a name and MAC; `None` when nothing or nothing unique matches
    pub fn select(&self, name: &str, mac: Option<&str>) -> Option<&VmRef> {
        match self.candidates(name) {
            [] => None,
            [only] => Some(only),
            many => {
                let mac = mac?.to_ascii_lowercase();
                let moid = self.moid_by_name_mac.get(&(name.to_string(), mac))?;
                many.iter().find(|vm| &vm.moid == moid)
            }
        }
    }
}

/// Counts of what one merge step changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub deduplicated: usize,
    pub vlan_links: usize,
    pub vm_links: usize,
}

/// Owner of the master collections of one pass
#[derive(Debug, Default)]
pub struct TopologyCorrelator {
    switches: Vec<Entity>,
    switch_by_uuid: HashMap<String, usize>,
    ports: Vec<Entity>,
    nodes: Vec<Entity>,
    node_by_mac: HashMap<String, usize>,
    vdans_by_host: BTreeMap<String, Vec<Entity>>,
    lans: Vec<Entity>,
    lan_by_identity: HashMap<Vec<(String, String)>, usize>,
    vlans: VlanMap,
    distributed_switches: HashMap<String, DistributedSwitchRef>,
    port_group_related_nodes: BTreeMap<String, u32>,
}

impl TopologyCorrelator {
    pub fn new(vlans: VlanMap, distributed_switches: HashMap<String, DistributedSwitchRef>) -> Self {
        Self {
            vlans,
            distributed_switches,
            ..Default::default()
        }
    }

    /// Merge a host's switches; a known UUID only gains a Host edge
    pub fn merge_switches(&mut self, host: &HostRef, built: Vec<BuiltEntity>) -> MergeStats {
        let mut stats = MergeStats::default();

        for BuiltEntity { mut entity, joins } in built {
            let Some(uuid) = joins.switch_uuid else {
                continue;
            };

            if let Some(&idx) = self.switch_by_uuid.get(&uuid) {
                self.switches[idx].add_parent(host.key());
                stats.deduplicated += 1;
                debug!(host = %host.name, uuid = %uuid, "Switch already collected, added host edge");
                continue;
            }

            if let Some(dvs) = self.distributed_switches.get(&uuid) {
                entity.set_property("distributed_switch", dvs.name.as_str());
                entity.add_parent(dvs.key());
            }
            self.switch_by_uuid.insert(uuid, self.switches.len());
            self.switches.push(entity);
            stats.added += 1;
        }

        stats
    }

    /// Merge a host's ports with their VLAN and VM joins
    pub fn merge_ports(
        &mut self,
        host: &HostRef,
        built: Vec<BuiltEntity>,
        vms: &VmDirectory,
    ) -> MergeStats {
        let mut stats = MergeStats::default();

        for BuiltEntity { mut entity, joins } in built {
            if self.link_vlan(&mut entity, &joins) {
                stats.vlan_links += 1;
            }
            if link_vm(&mut entity, &joins, vms) {
                stats.vm_links += 1;
            }
            self.ports.push(entity);
            stats.added += 1;
        }

        debug!(host = %host.name, ?stats, "Merged ports");
        stats
    }

    /// Merge the Vdans a host reported for one switch
    pub fn merge_vdans(
        &mut self,
        host: &HostRef,
        built: Vec<BuiltEntity>,
        vms: &VmDirectory,
    ) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut merged = Vec::with_capacity(built.len());

        for BuiltEntity { mut entity, joins } in built {
            if self.link_vlan(&mut entity, &joins) {
                stats.vlan_links += 1;
            }
            if link_vm(&mut entity, &joins, vms) {
                stats.vm_links += 1;
            }
            merged.push(entity);
            stats.added += 1;
        }

        self.vdans_by_host
            .entry(host.name.clone())
            .or_default()
            .extend(merged);
        stats
    }

    /// Merge LAN records; a LAN whose identifiers are already recorded only gains a Host edge.
    ///
    /// Resolved LANs are identified by `(switch UUID, LAN)`. Unresolved ones also
    /// carry the host and switch ID, so they never collapse across switches.
    pub fn merge_lans(&mut self, host: &HostRef, built: Vec<BuiltEntity>) -> MergeStats {
        let mut stats = MergeStats::default();

        for BuiltEntity { entity, .. } in built {
            let identity: Vec<(String, String)> = entity
                .key
                .identifiers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            match self.lan_by_identity.get(&identity) {
                Some(&idx) => {
                    self.lans[idx].add_parent(host.key());
                    stats.deduplicated += 1;
                }
                None => {
                    self.lan_by_identity.insert(identity, self.lans.len());
                    self.lans.push(entity);
                    stats.added += 1;
                }
            }
        }

        stats
    }

    /// Merge nodes; a MAC already present is never rebuilt, it only gains a Host edge
    pub fn merge_nodes(&mut self, host: &HostRef, built: Vec<BuiltEntity>) -> MergeStats {
        let mut stats = MergeStats::default();

        for BuiltEntity { mut entity, joins } in built {
            let mac = entity.key.name.clone();
            let node_key = match self.node_by_mac.get(&mac) {
                Some(&idx) => {
                    self.nodes[idx].add_parent(host.key());
                    stats.deduplicated += 1;
                    self.nodes[idx].key.clone()
                }
                None => {
                    if self.link_vlan(&mut entity, &joins) {
                        stats.vlan_links += 1;
                    }
                    let key = entity.key.clone();
                    self.node_by_mac.insert(mac, self.nodes.len());
                    self.nodes.push(entity);
                    stats.added += 1;
                    key
                }
            };

            if let Some(vdan_mac) = &joins.vdan_mac {
                self.link_node_to_vdans(host, &node_key, vdan_mac);
            }
        }

        stats
    }

    /// Make the node a parent of this host's Vdans with the given MAC
    fn link_node_to_vdans(&mut self, host: &HostRef, node: &ObjectKey, vdan_mac: &str) {
        let Some(vdans) = self.vdans_by_host.get_mut(&host.name) else {
            return;
        };
        for vdan in vdans
            .iter_mut()
            .filter(|v| v.property_text("mac") == Some(vdan_mac))
        {
            if vdan.add_parent(node.clone()) {
                debug!(host = %host.name, node = %node.name, vdan = %vdan.key.name, "Linked node to vdan");
            }
        }
    }

    /// Attach the port-group whose switch UUID matches the entity's owning switch
    fn link_vlan(&mut self, entity: &mut Entity, joins: &JoinKeys) -> bool {
        let (Some(vlan), Some(switch_uuid)) = (joins.vlan_id, joins.switch_uuid.as_deref()) else {
            return false;
        };
        let Some(candidates) = self.vlans.get(&vlan) else {
            return false;
        };
        let Some(group) = candidates.iter().find(|pg| pg.switch_uuid == switch_uuid) else {
            info!(
                entity = %entity.key.name,
                vlan,
                switch_uuid,
                "No port-group for VLAN on owning switch"
            );
            return false;
        };

        if entity.add_parent(group.key()) {
            *self
                .port_group_related_nodes
                .entry(group.name.clone())
                .or_insert(0) += 1;
        }
        true
    }

    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn lan_count(&self) -> usize {
        self.lans.len()
    }

    /// Move the master collections into a result set
    pub fn into_result(self) -> CollectResult {
        CollectResult {
            switches: self.switches,
            ports: self.ports,
            nodes: self.nodes,
            vdans: self.vdans_by_host.into_values().flatten().collect(),
            lans: self.lans,
            port_group_related_nodes: self.port_group_related_nodes,
            ..Default::default()
        }
    }
}

/// Attach the VM owning the entity's client name
fn link_vm(entity: &mut Entity, joins: &JoinKeys, vms: &VmDirectory) -> bool {
    let Some(name) = joins.vm_name.as_deref() else {
        return false;
    };

    match vms.select(name, joins.mac.as_deref()) {
        Some(vm) => entity.add_parent(vm.key()),
        None => {
            info!(
                entity = %entity.key.name,
                vm = %name,
                candidates = vms.candidates(name).len(),
                "No unique VM for client name"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectKind;

    fn host(name: &str) -> HostRef {
        HostRef {
            name: name.to_string(),
            resource_id: format!("r-{}", name),
            moid: format!("moid-{}", name),
        }
    }

    fn switch(uuid: &str, host: &HostRef) -> BuiltEntity {
        let mut entity = Entity::new(
            ObjectKey::new(ObjectKind::Switch, "vds-PRP-A").with_identifier("uuid", uuid),
        );
        entity.add_parent(host.key());
        BuiltEntity {
            entity,
            joins: JoinKeys {
                switch_uuid: Some(uuid.to_string()),
                ..Default::default()
            },
        }
    }

    fn node(mac: &str, vlan: u16, switch_uuid: &str, vdan_mac: Option<&str>) -> BuiltEntity {
        BuiltEntity {
            entity: Entity::new(ObjectKey::new(ObjectKind::Node, mac).with_identifier("uuid", mac)),
            joins: JoinKeys {
                vlan_id: Some(vlan),
                switch_uuid: Some(switch_uuid.to_string()),
                mac: Some(mac.to_string()),
                vdan_mac: vdan_mac.map(str::to_string),
                ..Default::default()
            },
        }
    }

    fn port(id: &str, vlan: u16, switch_uuid: &str, vm: Option<&str>, mac: &str) -> BuiltEntity {
        BuiltEntity {
            entity: Entity::new(ObjectKey::new(ObjectKind::Port, format!("PortID: {}", id))),
            joins: JoinKeys {
                vlan_id: Some(vlan),
                switch_uuid: Some(switch_uuid.to_string()),
                vm_name: vm.map(str::to_string),
                mac: Some(mac.to_string()),
                vdan_mac: None,
            },
        }
    }

    fn port_group(name: &str, switch_uuid: &str) -> PortGroupRef {
        PortGroupRef {
            name: name.to_string(),
            moid: format!("dvportgroup-{}", name),
            switch_uuid: switch_uuid.to_string(),
        }
    }

    #[test]
    fn test_switch_dedup_accumulates_host_edges() {
        let (h1, h2) = (host("esx-01"), host("esx-02"));
        let mut correlator = TopologyCorrelator::default();

        let first = correlator.merge_switches(&h1, vec![switch("uuid-a", &h1)]);
        let second = correlator.merge_switches(&h2, vec![switch("uuid-a", &h2)]);

        assert_eq!(first.added, 1);
        assert_eq!(second.deduplicated, 1);
        let result = correlator.into_result();
        assert_eq!(result.switches.len(), 1);
        assert_eq!(result.switches[0].parents_of_kind(ObjectKind::Host).count(), 2);
    }

    #[test]
    fn test_switch_gains_distributed_switch_parent() {
        let h1 = host("esx-01");
        let dvs = DistributedSwitchRef {
            name: "DSwitch-PRP".to_string(),
            uuid: "uuid-a".to_string(),
        };
        let mut correlator =
            TopologyCorrelator::new(VlanMap::new(), HashMap::from([("uuid-a".to_string(), dvs.clone())]));

        correlator.merge_switches(&h1, vec![switch("uuid-a", &h1)]);
        let result = correlator.into_result();

        assert!(result.switches[0].has_parent(&dvs.key()));
        assert_eq!(result.switches[0].property_text("distributed_switch"), Some("DSwitch-PRP"));
    }

    #[test]
    fn test_node_is_unique_by_mac() {
        let hosts = [host("esx-01"), host("esx-02"), host("esx-03")];
        let mut correlator = TopologyCorrelator::default();

        for h in &hosts {
            correlator.merge_nodes(h, vec![node("00:15:5d:01:02:03", 204, "uuid-a", None)]);
        }

        let result = correlator.into_result();
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].parents_of_kind(ObjectKind::Host).count(), 3);
    }

    #[test]
    fn test_vlan_join_selects_matching_switch() {
        let h1 = host("esx-01");
        let vlans = VlanMap::from([(
            204,
            vec![port_group("pg-other", "uuid-b"), port_group("pg-prp", "uuid-a")],
        )]);
        let mut correlator = TopologyCorrelator::new(vlans, HashMap::new());

        let stats = correlator.merge_ports(
            &h1,
            vec![port("1", 204, "uuid-a", None, "00:50:56:a1:22:33")],
            &VmDirectory::default(),
        );

        assert_eq!(stats.vlan_links, 1);
        let result = correlator.into_result();
        let groups: Vec<&str> = result.ports[0]
            .parents_of_kind(ObjectKind::PortGroup)
            .map(|k| k.name.as_str())
            .collect();
        assert_eq!(groups, vec!["pg-prp"]);
        assert_eq!(result.port_group_related_nodes.get("pg-prp"), Some(&1));
        assert_eq!(result.port_group_related_nodes.get("pg-other"), None);
    }

    #[test]
    fn test_vlan_join_without_matching_switch() {
        let h1 = host("esx-01");
        let vlans = VlanMap::from([(204, vec![port_group("pg-other", "uuid-b")])]);
        let mut correlator = TopologyCorrelator::new(vlans, HashMap::new());

        let stats = correlator.merge_ports(
            &h1,
            vec![port("1", 204, "uuid-a", None, "00:50:56:a1:22:33")],
            &VmDirectory::default(),
        );
        assert_eq!(stats.vlan_links, 0);
    }

    #[test]
    fn test_vm_join_single_and_ambiguous() {
        let h1 = host("esx-01");
        let vm = |moid: &str| VmRef {
            name: "plc-01".to_string(),
            moid: moid.to_string(),
        };
        let single = VmDirectory::new(HashMap::from([("plc-01".to_string(), vec![vm("vm-1")])]));
        let mut correlator = TopologyCorrelator::default();
        correlator.merge_ports(&h1, vec![port("1", 0, "uuid-a", Some("plc-01"), "aa:aa:aa:aa:aa:01")], &single);

        let mut ambiguous =
            VmDirectory::new(HashMap::from([("plc-01".to_string(), vec![vm("vm-1"), vm("vm-2")])]));
        assert!(ambiguous.is_ambiguous("plc-01"));
        ambiguous.insert_moid("plc-01", "AA:AA:AA:AA:AA:02", "vm-2");
        correlator.merge_ports(
            &h1,
            vec![
                port("2", 0, "uuid-a", Some("plc-01"), "aa:aa:aa:aa:aa:02"),
                port("3", 0, "uuid-a", Some("plc-01"), "aa:aa:aa:aa:aa:03"),
            ],
            &ambiguous,
        );
        correlator.merge_ports(
            &h1,
            vec![port("4", 0, "uuid-a", Some("ghost"), "aa:aa:aa:aa:aa:04")],
            &VmDirectory::default(),
        );

        let result = correlator.into_result();
        let vm_of = |i: usize| {
            result.ports[i]
                .parents_of_kind(ObjectKind::VirtualMachine)
                .map(|k| k.identifier("VMEntityObjectID").unwrap_or_default().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(vm_of(0), vec!["vm-1"]);
        assert_eq!(vm_of(1), vec!["vm-2"]);
        assert!(vm_of(2).is_empty());
        assert!(vm_of(3).is_empty());
    }

    #[test]
    fn test_lan_dedup_by_switch_and_side() {
        let (h1, h2) = (host("esx-01"), host("esx-02"));
        let lan = |host: &HostRef| {
            let mut entity = Entity::new(
                ObjectKey::new(ObjectKind::Lan, "LanA:vds-PRP-A")
                    .with_identifier("lan", "LanA")
                    .with_identifier("switch", "uuid-a"),
            );
            entity.add_parent(host.key());
            BuiltEntity {
                entity,
                joins: JoinKeys::default(),
            }
        };
        let mut correlator = TopologyCorrelator::default();

        correlator.merge_lans(&h1, vec![lan(&h1)]);
        let stats = correlator.merge_lans(&h2, vec![lan(&h2)]);

        assert_eq!(stats.deduplicated, 1);
        assert_eq!(correlator.lan_count(), 1);
    }

    #[test]
    fn test_unresolved_lans_stay_distinct_per_switch_and_host() {
        use crate::builder::EntityBuilder;
        use crate::parser::{parse_instance_list, parse_prp_config, parse_switch_list};
        use crate::resolver::HostResolution;

        let switches = parse_switch_list(
            "name  swID  maxPorts  numActivePorts  numPorts  mtu  numLcores  lcoreIDs\n----\n\
             ens-5  5  512  1  1  1500  1  0\n\
             ens-7  7  512  1  1  1500  1  0\n",
        )
        .records;
        let resolution = HostResolution::resolve(&switches, &parse_instance_list(""), ".eth");
        let mut correlator = TopologyCorrelator::default();

        for host in [host("esx-01"), host("esx-02")] {
            let builder = EntityBuilder::new(&host, &resolution);
            let up = parse_prp_config("Switch ID: 5\nLanA:\n status: up\n");
            let down = parse_prp_config("Switch ID: 7\nLanA:\n status: down\n");
            correlator.merge_lans(&host, builder.build_lans(up.switch_id, &up));
            correlator.merge_lans(&host, builder.build_lans(down.switch_id, &down));
        }

        let lans = correlator.into_result().lans;
        assert_eq!(lans.len(), 4);
        let statuses: Vec<(Option<f64>, Option<&str>)> = lans
            .iter()
            .map(|l| (l.property_number("switch_id"), l.property_text("status")))
            .collect();
        assert_eq!(statuses[0], (Some(5.0), Some("up")));
        assert_eq!(statuses[1], (Some(7.0), Some("down")));
    }

    #[test]
    fn test_node_links_to_current_host_vdans() {
        let (h1, h2) = (host("esx-01"), host("esx-02"));
        let vdan = |mac: &str| BuiltEntity {
            entity: Entity::new(ObjectKey::new(ObjectKind::Vdan, "0")).with_property("mac", mac),
            joins: JoinKeys::default(),
        };
        let mut correlator = TopologyCorrelator::default();
        let vms = VmDirectory::default();

        correlator.merge_vdans(&h1, vec![vdan("00:50:56:a1:22:33")], &vms);
        correlator.merge_vdans(&h2, vec![vdan("00:50:56:a1:22:33")], &vms);
        correlator.merge_nodes(&h1, vec![node("00:15:5d:01:02:03", 204, "uuid-a", Some("00:50:56:a1:22:33"))]);

        let result = correlator.into_result();
        let linked: Vec<usize> = result
            .vdans
            .iter()
            .map(|v| v.parents_of_kind(ObjectKind::Node).count())
            .collect();
        // Only the Vdan of the observing host is linked
        assert_eq!(linked, vec![1, 0]);
    }
}
