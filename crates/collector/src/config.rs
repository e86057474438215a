//! Collector configuration
//!
//! Loaded from an optional TOML/JSON file and `PRP_`-prefixed environment
//! variables; nested keys use `__`, e.g. `PRP_SSH__PORT=2222`.

use anyhow::{bail, Context, Result};
use prp_lib::channel::SshSettings;
use prp_lib::inventory::SuiteApiSettings;
use prp_lib::CollectionSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Collector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
}

/// Inventory (suite API) access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Adapter instance whose hosts are collected
    #[serde(default)]
    pub adapter_instance_id: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// JSON inventory snapshot used instead of the REST API
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

/// SSH access to the ESXi hosts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

/// Collection pass behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default = "default_redundancy_marker")]
    pub redundancy_marker: String,
    #[serde(default = "default_client_name_delimiter")]
    pub client_name_delimiter: String,
    #[serde(default = "default_max_parallel_hosts")]
    pub max_parallel_hosts: usize,
    #[serde(default = "default_management_address_property")]
    pub management_address_property: String,
}

fn default_base_url() -> String {
    "https://localhost/suite-api/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    60
}

fn default_redundancy_marker() -> String {
    "-PRP".to_string()
}

fn default_client_name_delimiter() -> String {
    ".eth".to_string()
}

fn default_max_parallel_hosts() -> usize {
    1
}

fn default_management_address_property() -> String {
    "net|mgmt_address".to_string()
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
            adapter_instance_id: String::new(),
            request_timeout_secs: default_request_timeout(),
            snapshot_path: None,
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            username: String::new(),
            password: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            redundancy_marker: default_redundancy_marker(),
            client_name_delimiter: default_client_name_delimiter(),
            max_parallel_hosts: default_max_parallel_hosts(),
            management_address_property: default_management_address_property(),
        }
    }
}

impl CollectorConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("PRP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read collector configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid collector configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.max_parallel_hosts == 0 {
            bail!("collection.max_parallel_hosts must be at least 1");
        }
        for (key, value) in [
            ("inventory.request_timeout_secs", self.inventory.request_timeout_secs),
            ("ssh.connect_timeout_secs", self.ssh.connect_timeout_secs),
            ("ssh.command_timeout_secs", self.ssh.command_timeout_secs),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
        }
        Ok(())
    }

    pub fn collection_settings(&self) -> CollectionSettings {
        CollectionSettings {
            instance_id: self.inventory.adapter_instance_id.clone(),
            redundancy_marker: self.collection.redundancy_marker.clone(),
            client_name_delimiter: self.collection.client_name_delimiter.clone(),
            management_address_property: self.collection.management_address_property.clone(),
            command_timeout: Duration::from_secs(self.ssh.command_timeout_secs),
            max_parallel_hosts: self.collection.max_parallel_hosts,
        }
    }

    pub fn ssh_settings(&self) -> SshSettings {
        SshSettings {
            port: self.ssh.port,
            username: self.ssh.username.clone(),
            password: self.ssh.password.clone(),
            connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
        }
    }

    pub fn suite_api_settings(&self) -> SuiteApiSettings {
        SuiteApiSettings {
            base_url: self.inventory.base_url.clone(),
            username: self.inventory.username.clone(),
            password: self.inventory.password.clone(),
            request_timeout: Duration::from_secs(self.inventory.request_timeout_secs),
        }
    }
}
