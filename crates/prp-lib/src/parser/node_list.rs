//! `nsxdp-cli ens prp stats node list` parsing

use super::{column, commands, numeric_column, ParseOutcome};
use crate::error::ParseError;
use serde::{Deserialize, Serialize};

/// Header and separator lines preceding the node table
const HEADER_LINES: usize = 2;

/// One node of the PRP node table; every column except the index is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRow {
    pub index: u32,
    pub mac: Option<String>,
    pub vlan_id: Option<u16>,
    pub node_type: Option<String>,
    pub redbox_mac: Option<String>,
    pub current_core: Option<String>,
    pub vdan_mac: Option<String>,
    pub sup_seq_a: Option<u64>,
    pub sup_seq_b: Option<u64>,
    pub age: Option<u64>,
}

/// Parse the node table; rows whose first column is not an index are skipped
pub fn parse_node_list(output: &str) -> ParseOutcome<NodeRow> {
    let mut outcome = ParseOutcome::default();

    for (idx, line) in output.lines().enumerate().skip(HEADER_LINES) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = columns.first() else {
            continue;
        };

        let Ok(index) = first.parse::<u32>() else {
            outcome.skip(ParseError::new(
                commands::NODE_LIST,
                idx + 1,
                line,
                "first column is not a node index",
            ));
            continue;
        };

        outcome.records.push(NodeRow {
            index,
            mac: column(&columns, 1).map(|m| m.to_ascii_lowercase()),
            vlan_id: numeric_column(&columns, 2),
            node_type: column(&columns, 3),
            redbox_mac: column(&columns, 4).map(|m| m.to_ascii_lowercase()),
            current_core: column(&columns, 5),
            vdan_mac: column(&columns, 6).map(|m| m.to_ascii_lowercase()),
            sup_seq_a: numeric_column(&columns, 7),
            sup_seq_b: numeric_column(&columns, 8),
            age: numeric_column(&columns, 9),
        });
    }

    outcome
}
