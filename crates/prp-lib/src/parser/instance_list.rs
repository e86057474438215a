//! `nsxdp-cli vswitch instance list` parsing
//!
//! The output holds one block per virtual switch. Each block starts with a
//! header line `DvsPortset-<N> (<friendly-name>) <uuid>` followed by the
//! switch's port table. Long client names wrap onto a continuation line that
//! carries no port number.

use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::commands;

const DVS_PORTSET_PREFIX: &str = "DvsPortset-";

static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+\(([^)]+)\)\s+(.*)$").expect("static regex"));

static PORTSET_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DvsPortset-(\d+)$").expect("static regex"));

static PORT_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<client>.+?)\s+(?P<port>\d{8,})\s+(?P<dvport>\S+)\s+(?P<mac>[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5})\s+(?P<uplink>[01])\s+(?P<vlan>\d+)\s+(?P<vni>\d+)\s*$",
    )
    .expect("static regex")
});

static PORT_NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)\d{8,}(?:\s|$)").expect("static regex"));

/// Block header of one distributed switch portset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortsetHeader {
    /// Internal switch name, e.g. `DvsPortset-0`
    pub internal_name: String,
    pub friendly_name: String,
    pub uuid: String,
}

impl PortsetHeader {
    /// The `<N>` of `DvsPortset-<N>`
    pub fn portset_number(&self) -> Option<u32> {
        PORTSET_NUMBER
            .captures(&self.internal_name)
            .and_then(|c| c[1].parse().ok())
    }
}

/// One port row of a portset block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRow {
    /// Internal name of the portset the row belongs to
    pub internal_name: String,
    /// Client name, with continuation lines stitched on
    pub client: String,
    pub port_id: u64,
    pub dv_port: String,
    pub mac: String,
    pub uplink: bool,
    pub vlan_id: u16,
    pub vni: u32,
}

/// Parsed instance list: the portset table and every port row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceList {
    pub portsets: Vec<PortsetHeader>,
    pub ports: Vec<PortRow>,
    #[serde(skip)]
    pub errors: Vec<ParseError>,
}

impl InstanceList {
    pub fn portset(&self, internal_name: &str) -> Option<&PortsetHeader> {
        self.portsets.iter().find(|p| p.internal_name == internal_name)
    }

    pub fn port(&self, port_id: u64) -> Option<&PortRow> {
        self.ports.iter().find(|p| p.port_id == port_id)
    }

    fn skip(&mut self, line_no: usize, line: &str, reason: &str) {
        tracing::debug!(
            command = commands::VSWITCH_INSTANCE_LIST,
            line_no,
            line = %line,
            reason,
            "Skipping unparsable record"
        );
        self.errors.push(ParseError::new(
            commands::VSWITCH_INSTANCE_LIST,
            line_no,
            line,
            reason,
        ));
    }
}

fn is_noise(trimmed: &str) -> bool {
    trimmed.is_empty()
        || trimmed.starts_with("Client")
        || trimmed.starts_with("Total")
        || trimmed.starts_with("---")
        || trimmed.starts_with("===")
}

/// Parse the instance list into portset headers and port rows
pub fn parse_instance_list(output: &str) -> InstanceList {
    let mut parsed = InstanceList::default();
    // Internal name of the block currently being read
    let mut current: Option<String> = None;
    // Index into `parsed.ports` of the last row of the current block
    let mut last_row: Option<usize> = None;

    for (idx, line) in output.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        // Block headers start at column zero
        if !line.starts_with(char::is_whitespace) && HEADER.is_match(trimmed) {
            last_row = None;
            if !trimmed.starts_with(DVS_PORTSET_PREFIX) {
                current = None;
                continue;
            }
            let Some(caps) = HEADER.captures(trimmed) else {
                continue;
            };
            let header = PortsetHeader {
                internal_name: caps[1].to_string(),
                friendly_name: caps[2].trim().to_string(),
                uuid: caps[3].trim().to_string(),
            };
            if header.friendly_name.is_empty() || header.uuid.is_empty() {
                parsed.skip(line_no, line, "portset header without friendly name or uuid");
                current = None;
                continue;
            }
            current = Some(header.internal_name.clone());
            parsed.portsets.push(header);
            continue;
        }

        if is_noise(trimmed) {
            continue;
        }

        let Some(internal_name) = current.clone() else {
            continue;
        };

        if !PORT_NUMBER_TOKEN.is_match(trimmed) {
            match last_row {
                Some(row) => parsed.ports[row].client.push_str(trimmed),
                None => parsed.skip(line_no, line, "continuation line without a preceding port row"),
            }
            continue;
        }

        let Some(caps) = PORT_ROW.captures(line) else {
            parsed.skip(line_no, line, "port row does not match instance list columns");
            last_row = None;
            continue;
        };

        let (Ok(port_id), Ok(vlan_id), Ok(vni)) = (
            caps["port"].parse::<u64>(),
            caps["vlan"].parse::<u16>(),
            caps["vni"].parse::<u32>(),
        ) else {
            parsed.skip(line_no, line, "numeric port column out of range");
            last_row = None;
            continue;
        };

        parsed.ports.push(PortRow {
            internal_name,
            client: caps["client"].trim().to_string(),
            port_id,
            dv_port: caps["dvport"].to_string(),
            mac: caps["mac"].to_ascii_lowercase(),
            uplink: &caps["uplink"] == "1",
            vlan_id,
            vni,
        });
        last_row = Some(parsed.ports.len() - 1);
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"DvsPortset-0 (vds-PRP-A)          50 2a 14 7e c1 9a 40 d2-8e 6a 31 45 0a c5 27 0f
Total Ports:8192 Available:8180
  Client                         PortID          DVPortID   MAC                  Uplink  VLAN  VNI
  vmnic2                         2214592516      8          00:00:00:00:00:00    1       0     0
  plc-controller-01.eth0         100663305       12         00:50:56:A1:22:33    0       204   0
  historian-x                    100663307       14         00:50:56:a1:22:35    0       205   0
vSwitch0 (vSwitch0)              standard
  Management                     33554436        -          00:00:00:00:00:01    0       0     0
DvsPortset-1 (vds-mgmt)          50 11 22 33 44 55 66 77-88 99 aa bb cc dd ee ff
  web-01.eth0                    117440517       3          00:50:56:b1:00:01    0       10    0
"#;

    #[test]
    fn test_parse_portset_headers() {
        let parsed = parse_instance_list(OUTPUT);

        assert_eq!(parsed.portsets.len(), 2);
        let first = &parsed.portsets[0];
        assert_eq!(first.internal_name, "DvsPortset-0");
        assert_eq!(first.friendly_name, "vds-PRP-A");
        assert_eq!(first.uuid, "50 2a 14 7e c1 9a 40 d2-8e 6a 31 45 0a c5 27 0f");
        assert_eq!(first.portset_number(), Some(0));
        assert_eq!(parsed.portsets[1].portset_number(), Some(1));
    }

    #[test]
    fn test_parse_port_rows_and_block_ownership() {
        let parsed = parse_instance_list(OUTPUT);

        // Standard switch rows are not part of any DVS block
        assert!(parsed.ports.iter().all(|p| p.client != "Management"));
        assert_eq!(parsed.ports.len(), 4);

        let plc = parsed.port(100663305).unwrap();
        assert_eq!(plc.internal_name, "DvsPortset-0");
        assert_eq!(plc.client, "plc-controller-01.eth0");
        assert_eq!(plc.mac, "00:50:56:a1:22:33");
        assert_eq!(plc.vlan_id, 204);
        assert!(!plc.uplink);

        let uplink = parsed.port(2214592516).unwrap();
        assert!(uplink.uplink);

        let web = parsed.port(117440517).unwrap();
        assert_eq!(web.internal_name, "DvsPortset-1");
    }

    #[test]
    fn test_continuation_line_is_stitched_verbatim() {
        let output = "DvsPortset-0 (vds-PRP-A)  uuid-1\n  historian-primary-with-a-ve 100663306  13  00:50:56:a1:22:34  0  204  0\n  ry-long-name.eth1\n";
        let parsed = parse_instance_list(output);

        assert_eq!(parsed.ports.len(), 1);
        assert_eq!(parsed.ports[0].client, "historian-primary-with-a-very-long-name.eth1");
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_continuation_before_any_row_is_reported() {
        let output = "DvsPortset-0 (vds-PRP-A)  uuid-1\n  dangling-name-tail\n";
        let parsed = parse_instance_list(output);

        assert!(parsed.ports.is_empty());
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].command, commands::VSWITCH_INSTANCE_LIST);
    }

    #[test]
    fn test_malformed_row_skips_and_continues() {
        let output = "DvsPortset-0 (vds-PRP-A)  uuid-1\n  broken 100663306 not-a-mac\n  good.eth0  100663307  14  00:50:56:a1:22:35  0  205  0\n";
        let parsed = parse_instance_list(output);

        assert_eq!(parsed.ports.len(), 1);
        assert_eq!(parsed.ports[0].port_id, 100663307);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].line_no, 2);
    }
}
