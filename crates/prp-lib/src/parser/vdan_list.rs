//! `nsxdp-cli ens prp stats vdan list` parsing
//!
//! Each VDAN spans two lines: a `lanA` line that carries the VDAN's common
//! columns, then an indented `lanB` line with the LanB counters only.

use super::{commands, ParseOutcome};
use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LAN_A_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d+)\s+([\da-fA-F:]+)\s+(\d+)\s+(\d+)\s+(\d+)\s+lanA\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)",
    )
    .expect("static regex")
});

static LAN_B_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*lanB\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)").expect("static regex")
});

/// Per-LAN transmit counters of a VDAN
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanCounters {
    pub prp_tx_pkts: u64,
    pub non_prp_pkts: u64,
    pub tx_bytes: u64,
    pub tx_drops: u64,
    pub sup_tx_pkts: u64,
}

impl LanCounters {
    fn from_captures(caps: &regex::Captures<'_>, first: usize) -> Option<Self> {
        let n = |i: usize| caps.get(first + i)?.as_str().parse::<u64>().ok();
        Some(Self {
            prp_tx_pkts: n(0)?,
            non_prp_pkts: n(1)?,
            tx_bytes: n(2)?,
            tx_drops: n(3)?,
            sup_tx_pkts: n(4)?,
        })
    }

    /// `(metric suffix, value)` pairs
    pub fn metrics(&self) -> [(&'static str, u64); 5] {
        [
            ("prpTxPkts", self.prp_tx_pkts),
            ("nonPRPPkts", self.non_prp_pkts),
            ("txBytes", self.tx_bytes),
            ("txDrops", self.tx_drops),
            ("supTxPkts", self.sup_tx_pkts),
        ]
    }
}

/// One VDAN with its LanA and (optional) LanB counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdanRow {
    pub index: u32,
    pub mac: String,
    pub vlan_id: u16,
    pub fc_port_id: u32,
    pub age: u64,
    pub lan_a: LanCounters,
    pub lan_b: Option<LanCounters>,
}

/// Parse the VDAN table
pub fn parse_vdan_list(output: &str) -> ParseOutcome<VdanRow> {
    let mut outcome: ParseOutcome<VdanRow> = ParseOutcome::default();
    // Index of the most recently introduced VDAN
    let mut current: Option<u32> = None;

    for (idx, raw) in output.trim().lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("===") || line.starts_with("Total PRP") {
            continue;
        }

        if let Some(caps) = LAN_A_LINE.captures(line) {
            let common = (|| {
                Some((
                    caps[1].parse::<u32>().ok()?,
                    caps[3].parse::<u16>().ok()?,
                    caps[4].parse::<u32>().ok()?,
                    caps[5].parse::<u64>().ok()?,
                    LanCounters::from_captures(&caps, 6)?,
                ))
            })();

            match common {
                Some((index, vlan_id, fc_port_id, age, lan_a)) => {
                    outcome.records.push(VdanRow {
                        index,
                        mac: caps[2].to_ascii_lowercase(),
                        vlan_id,
                        fc_port_id,
                        age,
                        lan_a,
                        lan_b: None,
                    });
                    current = Some(index);
                }
                None => {
                    // A following lanB line has no accepted lanA record to join
                    current = None;
                    outcome.skip(ParseError::new(
                        commands::VDAN_LIST,
                        line_no,
                        raw,
                        "numeric VDAN column out of range",
                    ));
                }
            }
            continue;
        }

        if let Some(caps) = LAN_B_LINE.captures(line) {
            let Some(index) = current else {
                // LanB without a LanA line is dropped
                continue;
            };
            let Some(counters) = LanCounters::from_captures(&caps, 1) else {
                outcome.skip(ParseError::new(
                    commands::VDAN_LIST,
                    line_no,
                    raw,
                    "numeric lanB column out of range",
                ));
                continue;
            };
            if let Some(row) = outcome.records.iter_mut().rev().find(|r| r.index == index) {
                row.lan_b = Some(counters);
            }
            continue;
        }

        outcome.skip(ParseError::new(
            commands::VDAN_LIST,
            line_no,
            raw,
            "line is neither a lanA nor a lanB row",
        ));
    }

    outcome
}
