//! Parsers for ENS/PRP diagnostic command output
//!
//! Each parser turns the text of one CLI command into typed records. Parsers
//! are pure: they never fail as a whole, a line or block that does not match
//! the grammar is skipped and reported through [`ParseOutcome::errors`].

mod instance_list;
mod latency;
mod node_list;
mod prp_config;
mod switch_list;
mod vdan_list;

pub use instance_list::{parse_instance_list, InstanceList, PortRow, PortsetHeader};
pub use latency::{parse_latency_dump, PortLatency, LATENCY_LINES};
pub use node_list::{parse_node_list, NodeRow};
pub use prp_config::{parse_prp_config, LanConfig, LanSide, PrpConfig};
pub use switch_list::{parse_switch_list, EnsSwitch};
pub use vdan_list::{parse_vdan_list, LanCounters, VdanRow};

use crate::error::ParseError;
use tracing::debug;

/// Commands run on every host
pub mod commands {
    pub const ENS_SWITCH_LIST: &str = "nsxdp-cli ens switch list";
    pub const VSWITCH_INSTANCE_LIST: &str = "nsxdp-cli vswitch instance list";
    pub const LATENCY_DUMP: &str = "nsxdp-cli ens latency system dump";

    pub fn vdan_list(switch_id: u32) -> String {
        format!("nsxdp-cli ens prp stats vdan list -s {}", switch_id)
    }

    pub fn prp_config(switch_id: u32) -> String {
        format!("nsxdp-cli ens prp config get -s {}", switch_id)
    }

    pub fn node_list(switch_id: u32) -> String {
        format!("nsxdp-cli ens prp stats node list -s {}", switch_id)
    }

    pub const VDAN_LIST: &str = "nsxdp-cli ens prp stats vdan list";
    pub const PRP_CONFIG: &str = "nsxdp-cli ens prp config get";
    pub const NODE_LIST: &str = "nsxdp-cli ens prp stats node list";
}

/// Records parsed from one command plus the records that were skipped
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<T> {
    pub records: Vec<T>,
    pub errors: Vec<ParseError>,
}

impl<T> Default for ParseOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> ParseOutcome<T> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a skipped line and log the parse decision
    pub(crate) fn skip(&mut self, err: ParseError) {
        debug!(
            command = err.command,
            line_no = err.line_no,
            line = %err.line,
            reason = %err.reason,
            "Skipping unparsable record"
        );
        self.errors.push(err);
    }
}

/// Parse an optional column: absent, empty or `-` means no value
pub(crate) fn column(columns: &[&str], index: usize) -> Option<String> {
    columns
        .get(index)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && *c != "-")
        .map(str::to_string)
}

/// Parse an optional numeric column; a non-numeric value is treated as absent
pub(crate) fn numeric_column<N: std::str::FromStr>(columns: &[&str], index: usize) -> Option<N> {
    column(columns, index).and_then(|c| c.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_treats_blank_and_dash_as_absent() {
        let cols = vec!["1", "", "-", "abc"];
        assert_eq!(column(&cols, 0), Some("1".to_string()));
        assert_eq!(column(&cols, 1), None);
        assert_eq!(column(&cols, 2), None);
        assert_eq!(column(&cols, 9), None);
        assert_eq!(numeric_column::<u64>(&cols, 3), None);
        assert_eq!(numeric_column::<u64>(&cols, 0), Some(1));
    }

    #[test]
    fn test_switch_scoped_commands() {
        assert_eq!(commands::vdan_list(3), "nsxdp-cli ens prp stats vdan list -s 3");
        assert_eq!(commands::prp_config(0), "nsxdp-cli ens prp config get -s 0");
        assert_eq!(commands::node_list(12), "nsxdp-cli ens prp stats node list -s 12");
    }
}
