//! REST inventory client for the operations suite API

use super::{
    parse_vlan_id, InventoryProvider, MAC_PROPERTY_SUFFIX, PORT_GROUP_SWITCH_PROPERTY,
    SWITCH_UUID_PROPERTY, VCENTER_ADAPTER_KIND, VLAN_ID_PROPERTY, VM_PARENT_HOST_PROPERTY,
};
use crate::correlator::VlanMap;
use crate::error::InventoryError;
use crate::models::{DistributedSwitchRef, HostRef, PortGroupRef, VmRef};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const MOID_IDENTIFIER: &str = "VMEntityObjectID";

/// Connection settings of the suite API
#[derive(Debug, Clone)]
pub struct SuiteApiSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceQuery<'a> {
    adapter_kind: Vec<&'a str>,
    resource_kind: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    adapter_instance_id: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    name: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property_conditions: Option<PropertyConditions<'a>>,
}

impl<'a> ResourceQuery<'a> {
    fn new(resource_kind: &'a str) -> Self {
        Self {
            adapter_kind: vec![VCENTER_ADAPTER_KIND],
            resource_kind: vec![resource_kind],
            adapter_instance_id: Vec::new(),
            name: Vec::new(),
            property_conditions: None,
        }
    }

    fn instance(mut self, instance_id: &'a str) -> Self {
        self.adapter_instance_id.push(instance_id);
        self
    }

    fn named(mut self, name: &'a str) -> Self {
        self.name.push(name);
        self
    }

    fn property_equals(mut self, key: &'a str, value: &'a str) -> Self {
        self.property_conditions = Some(PropertyConditions {
            conjunction_operator: "OR",
            conditions: vec![PropertyCondition {
                key,
                operator: "EQ",
                string_value: value,
            }],
        });
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PropertyConditions<'a> {
    conjunction_operator: &'a str,
    conditions: Vec<PropertyCondition<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PropertyCondition<'a> {
    key: &'a str,
    operator: &'a str,
    string_value: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceList {
    #[serde(default)]
    resource_list: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resource {
    identifier: String,
    resource_key: ResourceKey,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceKey {
    name: String,
    #[serde(default)]
    resource_identifiers: Vec<ResourceIdentifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceIdentifier {
    identifier_type: IdentifierType,
    value: String,
}

#[derive(Debug, Deserialize)]
struct IdentifierType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PropertyList {
    #[serde(default)]
    property: Vec<Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    name: String,
    value: String,
}

impl Resource {
    fn identifier_value(&self, key: &str) -> Option<&str> {
        self.resource_key
            .resource_identifiers
            .iter()
            .find(|i| i.identifier_type.name == key)
            .map(|i| i.value.as_str())
    }

    fn moid(&self) -> Result<String, InventoryError> {
        self.identifier_value(MOID_IDENTIFIER)
            .map(str::to_string)
            .ok_or_else(|| InventoryError::MissingField(self.resource_key.name.clone(), MOID_IDENTIFIER))
    }
}

/// Inventory provider backed by the suite API
pub struct SuiteApiInventory {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl SuiteApiInventory {
    pub fn new(settings: &SuiteApiSettings) -> Result<Self, InventoryError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;

        // `Url::join` drops the last segment unless the base ends with a slash
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        Ok(Self {
            client,
            base_url,
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, InventoryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| InventoryError::Decode(e.to_string()))
    }

    async fn query(&self, query: &ResourceQuery<'_>) -> Result<Vec<Resource>, InventoryError> {
        let url = self.base_url.join("api/resources/query")?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(query)
            .send()
            .await?;

        let list: ResourceList = Self::decode(response).await?;
        debug!(
            resource_kind = ?query.resource_kind,
            count = list.resource_list.len(),
            "Inventory query returned resources"
        );
        Ok(list.resource_list)
    }

    async fn properties(&self, resource_id: &str) -> Result<HashMap<String, String>, InventoryError> {
        let url = self
            .base_url
            .join(&format!("api/resources/{}/properties", resource_id))?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let list: PropertyList = Self::decode(response).await?;
        Ok(list.property.into_iter().map(|p| (p.name, p.value)).collect())
    }
}

#[async_trait]
impl InventoryProvider for SuiteApiInventory {
    async fn resolve_hosts(&self, instance_id: &str) -> Result<Vec<HostRef>, InventoryError> {
        let resources = self
            .query(&ResourceQuery::new("HostSystem").instance(instance_id))
            .await?;

        resources
            .into_iter()
            .map(|r| -> Result<HostRef, InventoryError> {
                Ok(HostRef {
                    moid: r.moid()?,
                    name: r.resource_key.name,
                    resource_id: r.identifier,
                })
            })
            .collect()
    }

    async fn host_property(&self, host: &HostRef, key: &str) -> Result<Option<String>, InventoryError> {
        let mut properties = self.properties(&host.resource_id).await?;
        Ok(properties.remove(key).filter(|v| !v.trim().is_empty()))
    }

    async fn vms_by_host(
        &self,
        instance_id: &str,
        host_name: &str,
    ) -> Result<HashMap<String, Vec<VmRef>>, InventoryError> {
        let query = ResourceQuery::new("VirtualMachine")
            .instance(instance_id)
            .property_equals(VM_PARENT_HOST_PROPERTY, host_name);
        let resources = self.query(&query).await?;

        let mut by_name: HashMap<String, Vec<VmRef>> = HashMap::new();
        for r in resources {
            let vm = VmRef {
                moid: r.moid()?,
                name: r.resource_key.name,
            };
            by_name.entry(vm.name.clone()).or_default().push(vm);
        }
        Ok(by_name)
    }

    async fn distributed_switches(
        &self,
        instance_id: &str,
    ) -> Result<HashMap<String, DistributedSwitchRef>, InventoryError> {
        let resources = self
            .query(&ResourceQuery::new("VmwareDistributedVirtualSwitch").instance(instance_id))
            .await?;

        let mut switches = HashMap::new();
        for r in resources {
            let mut properties = self.properties(&r.identifier).await?;
            let Some(uuid) = properties.remove(SWITCH_UUID_PROPERTY) else {
                info!(switch = %r.resource_key.name, "Distributed switch without UUID property");
                continue;
            };
            switches.insert(
                uuid.clone(),
                DistributedSwitchRef {
                    name: r.resource_key.name,
                    uuid,
                },
            );
        }
        Ok(switches)
    }

    async fn vlan_port_groups(&self, instance_id: &str) -> Result<VlanMap, InventoryError> {
        let resources = self
            .query(&ResourceQuery::new("DistributedVirtualPortgroup").instance(instance_id))
            .await?;

        let mut vlans = VlanMap::new();
        for r in resources {
            let properties = self.properties(&r.identifier).await?;
            let vlan = properties.get(VLAN_ID_PROPERTY).and_then(|v| parse_vlan_id(v));
            let switch_uuid = properties.get(PORT_GROUP_SWITCH_PROPERTY);

            let (Some(vlan), Some(switch_uuid)) = (vlan, switch_uuid) else {
                debug!(port_group = %r.resource_key.name, "Port-group without VLAN or switch UUID");
                continue;
            };
            vlans.entry(vlan).or_default().push(PortGroupRef {
                moid: r.moid()?,
                switch_uuid: switch_uuid.clone(),
                name: r.resource_key.name,
            });
        }
        Ok(vlans)
    }

    async fn vm_moid_by_mac(&self, vm_name: &str, mac: &str) -> Result<Option<String>, InventoryError> {
        let resources = self
            .query(&ResourceQuery::new("VirtualMachine").named(vm_name))
            .await?;

        for r in resources {
            let properties = self.properties(&r.identifier).await?;
            let owns_mac = properties
                .iter()
                .any(|(k, v)| k.ends_with(MAC_PROPERTY_SUFFIX) && v.trim().eq_ignore_ascii_case(mac));
            if owns_mac {
                return r.moid().map(Some);
            }
        }
        Ok(None)
    }
}
