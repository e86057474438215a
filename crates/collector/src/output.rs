//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use prp_lib::{CollectResult, ConnectivityReport, Entity, HostFailure, ObjectKey};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

/// Output format for result sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON document (default)
    #[default]
    Json,
    /// Summary tables
    Table,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Serialize)]
pub struct Relationship<'a> {
    pub parent: &'a ObjectKey,
    pub child: &'a ObjectKey,
}

/// Serialized result set of one collection pass
#[derive(Debug, Serialize)]
pub struct ResultDocument<'a> {
    pub started_at: i64,
    pub finished_at: i64,
    pub objects: Vec<&'a Entity>,
    pub relationships: Vec<Relationship<'a>>,
    pub hosts_collected: &'a [String],
    pub failed_hosts: &'a [HostFailure],
    pub port_group_related_nodes: &'a BTreeMap<String, u32>,
}

impl<'a> ResultDocument<'a> {
    pub fn new(result: &'a CollectResult) -> Self {
        let relationships = result
            .entities()
            .flat_map(|e| {
                e.parents.iter().map(move |p| Relationship {
                    parent: p,
                    child: &e.key,
                })
            })
            .collect();

        Self {
            started_at: result.started_at,
            finished_at: result.finished_at,
            objects: result.entities().collect(),
            relationships,
            hosts_collected: &result.hosts_collected,
            failed_hosts: &result.failed_hosts,
            port_group_related_nodes: &result.port_group_related_nodes,
        }
    }
}

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Objects")]
    count: usize,
}

#[derive(Tabled)]
struct FailedHostRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct ConnectivityRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Render a result set in the requested format
pub fn render_result(result: &CollectResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&ResultDocument::new(result))?),
        OutputFormat::Table => Ok(result_tables(result)),
    }
}

fn result_tables(result: &CollectResult) -> String {
    let kinds = vec![
        KindRow {
            kind: "Switch",
            count: result.switches.len(),
        },
        KindRow {
            kind: "Port",
            count: result.ports.len(),
        },
        KindRow {
            kind: "Vdan",
            count: result.vdans.len(),
        },
        KindRow {
            kind: "Lan",
            count: result.lans.len(),
        },
        KindRow {
            kind: "Node",
            count: result.nodes.len(),
        },
    ];
    let mut out = Table::new(kinds).with(Style::rounded()).to_string();
    out.push('\n');
    out.push_str(&format!(
        "{} hosts collected, {} relationships\n",
        result.hosts_collected.len(),
        result.relationships().len()
    ));

    if !result.failed_hosts.is_empty() {
        let failed: Vec<FailedHostRow> = result
            .failed_hosts
            .iter()
            .map(|f| FailedHostRow {
                host: f.host.clone(),
                state: f.state.clone(),
                reason: f.reason.red().to_string(),
            })
            .collect();
        out.push_str(&Table::new(failed).with(Style::rounded()).to_string());
        out.push('\n');
    }
    out
}

/// Render per-host connectivity reports
pub fn render_connectivity(reports: &[ConnectivityReport], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        OutputFormat::Table => {
            let rows: Vec<ConnectivityRow> = reports
                .iter()
                .map(|r| ConnectivityRow {
                    host: r.host.clone(),
                    address: r.address.clone().unwrap_or_else(|| "-".to_string()),
                    status: if r.reachable {
                        "reachable".green().to_string()
                    } else {
                        r.error
                            .as_deref()
                            .unwrap_or("unreachable")
                            .red()
                            .to_string()
                    },
                })
                .collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use prp_lib::ObjectKind;

    fn result() -> CollectResult {
        let host = ObjectKey::new(ObjectKind::Host, "esx-01").with_identifier("VMEntityObjectID", "host-10");
        let mut node = Entity::new(
            ObjectKey::new(ObjectKind::Node, "00:15:5d:01:02:03").with_identifier("uuid", "00:15:5d:01:02:03"),
        );
        node.add_parent(host);
        CollectResult {
            nodes: vec![node],
            hosts_collected: vec!["esx-01".to_string()],
            failed_hosts: vec![HostFailure {
                host: "esx-02".to_string(),
                state: "Connecting".to_string(),
                reason: "connection refused".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_json_document_has_relationships() {
        let json = render_result(&result(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["objects"].as_array().unwrap().len(), 1);
        assert_eq!(value["relationships"][0]["parent"]["name"], "esx-01");
        assert_eq!(value["relationships"][0]["child"]["name"], "00:15:5d:01:02:03");
        assert_eq!(value["failed_hosts"][0]["state"], "Connecting");
    }

    #[test]
    fn test_table_lists_failed_hosts() {
        colored::control::set_override(false);
        let table = render_result(&result(), OutputFormat::Table).unwrap();

        assert!(table.contains("Node"));
        assert!(table.contains("esx-02"));
        assert!(table.contains("1 hosts collected, 1 relationships"));
    }
}
