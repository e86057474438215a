//! `nsxdp-cli ens switch list` parsing
//!
//! The output is a fixed-column table: a header, a separator, then one row
//! per ENS switch instance.

use super::{commands, ParseOutcome};
use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>.*?)\s{2,}(?P<sw_id>\d+)\s+(?P<max_ports>\d+)\s+(?P<num_active_ports>\d+)\s+(?P<num_ports>\d+)\s+(?P<mtu>\d+)\s+(?P<num_lcores>\d+)\s+(?P<lcore_ids>(?:\d+\s*)+)$",
    )
    .expect("static regex")
});

/// One row of the ENS switch list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsSwitch {
    /// Internal switch name, joined against the portset table
    pub name: String,
    /// Host-local numeric switch ID
    pub switch_id: u32,
    pub max_ports: u32,
    pub num_active_ports: u32,
    pub num_ports: u32,
    pub mtu: u32,
    pub num_lcores: u32,
    /// Space-separated lcore IDs as printed
    pub lcore_ids: String,
}

impl EnsSwitch {
    /// The lcore ID list as integers
    pub fn lcore_id_list(&self) -> Vec<u32> {
        self.lcore_ids
            .split_whitespace()
            .filter_map(|id| id.parse().ok())
            .collect()
    }
}

/// Parse the switch list table; rows that do not match are skipped
pub fn parse_switch_list(output: &str) -> ParseOutcome<EnsSwitch> {
    let mut outcome = ParseOutcome::default();

    for (idx, line) in output.trim().lines().enumerate().skip(2) {
        let line_no = idx + 1;
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            continue;
        }

        let Some(caps) = ROW.captures(trimmed) else {
            outcome.skip(ParseError::new(
                commands::ENS_SWITCH_LIST,
                line_no,
                line,
                "row does not match switch list columns",
            ));
            continue;
        };

        let number = |name: &str| caps[name].parse::<u32>();
        let row = (|| -> Result<EnsSwitch, std::num::ParseIntError> {
            Ok(EnsSwitch {
                name: caps["name"].trim().to_string(),
                switch_id: number("sw_id")?,
                max_ports: number("max_ports")?,
                num_active_ports: number("num_active_ports")?,
                num_ports: number("num_ports")?,
                mtu: number("mtu")?,
                num_lcores: number("num_lcores")?,
                lcore_ids: caps["lcore_ids"].trim().to_string(),
            })
        })();

        match row {
            Ok(row) if !row.name.is_empty() => outcome.records.push(row),
            Ok(_) => outcome.skip(ParseError::new(
                commands::ENS_SWITCH_LIST,
                line_no,
                line,
                "switch name is empty",
            )),
            Err(e) => outcome.skip(ParseError::new(
                commands::ENS_SWITCH_LIST,
                line_no,
                line,
                format!("numeric column out of range: {}", e),
            )),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"name              swID  maxPorts  numActivePorts  numPorts  mtu   numLcores  lcoreIDs
---------------------------------------------------------------------------------------
DvsPortset-0      0     8192      12              12        9000  2          0 1
DvsPortset-1      1     8192      4               4         1500  4          2 3 4 5

"#;

    #[test]
    fn test_parse_switch_list_rows() {
        let outcome = parse_switch_list(OUTPUT);
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.errors.is_empty());

        let first = &outcome.records[0];
        assert_eq!(first.name, "DvsPortset-0");
        assert_eq!(first.switch_id, 0);
        assert_eq!(first.mtu, 9000);
        assert_eq!(first.lcore_ids, "0 1");

        let second = &outcome.records[1];
        assert_eq!(second.num_lcores, 4);
        assert_eq!(second.lcore_id_list(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_parse_single_row_scenario() {
        let output = "name  swID  maxPorts  active  ports  mtu  lcores  ids\n------\nens-dvs0  123  512  10  10  1500  4  0 1 2 3";
        let outcome = parse_switch_list(output);

        assert_eq!(
            outcome.records,
            vec![EnsSwitch {
                name: "ens-dvs0".to_string(),
                switch_id: 123,
                max_ports: 512,
                num_active_ports: 10,
                num_ports: 10,
                mtu: 1500,
                num_lcores: 4,
                lcore_ids: "0 1 2 3".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_row_is_skipped_not_fatal() {
        let output = "header\n-----\nbroken row here\nDvsPortset-2   2  64  1  1  1500  1  7\n";
        let outcome = parse_switch_list(output);

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].switch_id, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].line_no, 3);
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse_switch_list(OUTPUT), parse_switch_list(OUTPUT));
    }

    #[test]
    fn test_empty_output() {
        let outcome = parse_switch_list("");
        assert!(outcome.is_empty());
        assert!(outcome.errors.is_empty());
    }
}
