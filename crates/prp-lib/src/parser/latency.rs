//! `nsxdp-cli ens latency system dump` parsing

use super::{commands, ParseOutcome};
use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PORT_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"PortID:\s+").expect("static regex"));

/// Metric line order inside a port block, starting at block line 2
pub const LATENCY_LINES: [&str; 16] = [
    "total_samples",
    "min_latency",
    "max_latency",
    "mean",
    "max",
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

/// Block line index of the first metric line (0 is the port ID, 1 the column title)
const FIRST_METRIC_LINE: usize = 2;

/// Latency and histogram values of one switch port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortLatency {
    pub port_id: u64,
    /// Transmit values, indexed like [`LATENCY_LINES`]
    pub tx: [Option<f64>; 16],
    /// Receive values, indexed like [`LATENCY_LINES`]
    pub rx: [Option<f64>; 16],
}

impl PortLatency {
    /// Present values as `(metric key, value)` pairs, e.g. `tx_mean`
    pub fn metrics(&self) -> Vec<(String, f64)> {
        let mut metrics = Vec::new();
        for (prefix, values) in [("tx", &self.tx), ("rx", &self.rx)] {
            for (name, value) in LATENCY_LINES.iter().zip(values.iter()) {
                if let Some(v) = value {
                    metrics.push((format!("{}_{}", prefix, name), *v));
                }
            }
        }
        metrics
    }
}

/// Parse the latency dump into one record per `PortID:` block
pub fn parse_latency_dump(output: &str) -> ParseOutcome<PortLatency> {
    let mut outcome = ParseOutcome::default();

    // Text before the first delimiter is a preamble
    for (block_no, block) in PORT_DELIMITER.split(output).enumerate().skip(1) {
        let lines: Vec<&str> = block.lines().collect();
        let first = lines.first().copied().unwrap_or_default();

        let Some(port_id) = first
            .split_whitespace()
            .next()
            .and_then(|t| t.parse::<u64>().ok())
        else {
            outcome.skip(ParseError::new(
                commands::LATENCY_DUMP,
                block_no,
                first,
                "latency block without a numeric port ID",
            ));
            continue;
        };

        let mut tx = [None; 16];
        let mut rx = [None; 16];
        for (slot, line) in lines.iter().skip(FIRST_METRIC_LINE).take(LATENCY_LINES.len()).enumerate() {
            let columns: Vec<&str> = line.split_whitespace().collect();
            tx[slot] = columns.get(1).and_then(|v| v.parse::<f64>().ok());
            rx[slot] = columns.get(2).and_then(|v| v.parse::<f64>().ok());
        }

        outcome.records.push(PortLatency { port_id, tx, rx });
    }

    outcome
}
