//! `nsxdp-cli ens prp config get` parsing
//!
//! The switch ID and every LAN field are found by independent scans, so a
//! field missing from one section never shifts another.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SWITCH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Switch\s*ID\s*:\s*(\d+)").expect("static regex"));

static SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(LanA|LanB)\b\s*:?").expect("static regex"));

static UPLINK1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*uplink1\s*:\s*(\S+)").expect("static regex"));
static UPLINK2: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*uplink2\s*:\s*(\S+)").expect("static regex"));
static POLICY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*policy\s*:\s*(\S+)").expect("static regex"));
static STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*status\s*:\s*(\S+)").expect("static regex"));

/// Physical LAN side of the redundancy pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanSide {
    LanA,
    LanB,
}

impl LanSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanSide::LanA => "LanA",
            LanSide::LanB => "LanB",
        }
    }

    fn from_title(title: &str) -> Option<Self> {
        match title {
            "LanA" => Some(LanSide::LanA),
            "LanB" => Some(LanSide::LanB),
            _ => None,
        }
    }
}

/// Link configuration of one LAN side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanConfig {
    pub side: LanSide,
    pub uplink1: Option<String>,
    pub uplink2: Option<String>,
    pub policy: Option<String>,
    pub status: Option<String>,
}

/// Parsed PRP configuration of one switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrpConfig {
    pub switch_id: Option<u32>,
    pub lans: Vec<LanConfig>,
}

fn scan(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}

/// Parse the PRP config of a switch
pub fn parse_prp_config(output: &str) -> PrpConfig {
    let switch_id = SWITCH_ID
        .captures(output)
        .and_then(|c| c[1].parse::<u32>().ok());

    let titles: Vec<(usize, usize, LanSide)> = SECTION
        .captures_iter(output)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let side = LanSide::from_title(c.get(1)?.as_str())?;
            Some((whole.start(), whole.end(), side))
        })
        .collect();

    let mut lans: Vec<LanConfig> = Vec::new();
    for (i, (_, body_start, side)) in titles.iter().enumerate() {
        let body_end = titles.get(i + 1).map(|t| t.0).unwrap_or(output.len());
        let body = &output[*body_start..body_end];

        // A repeated section title keeps the first occurrence
        if lans.iter().any(|l| l.side == *side) {
            continue;
        }

        lans.push(LanConfig {
            side: *side,
            uplink1: scan(&UPLINK1, body),
            uplink2: scan(&UPLINK2, body),
            policy: scan(&POLICY, body),
            status: scan(&STATUS, body),
        });
    }

    PrpConfig { switch_id, lans }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = r#"PRP configuration
Switch ID: 3
LanA:
    uplink1 : vmnic2
    uplink2 : vmnic4
    policy  : failover
    status  : up
LanB:
    uplink1 : vmnic3
    policy  : failover
    status  : down
"#;

    #[test]
    fn test_parse_both_sections() {
        let config = parse_prp_config(OUTPUT);

        assert_eq!(config.switch_id, Some(3));
        assert_eq!(config.lans.len(), 2);

        let lan_a = &config.lans[0];
        assert_eq!(lan_a.side, LanSide::LanA);
        assert_eq!(lan_a.uplink1.as_deref(), Some("vmnic2"));
        assert_eq!(lan_a.uplink2.as_deref(), Some("vmnic4"));
        assert_eq!(lan_a.status.as_deref(), Some("up"));

        let lan_b = &config.lans[1];
        assert_eq!(lan_b.side, LanSide::LanB);
        assert_eq!(lan_b.uplink1.as_deref(), Some("vmnic3"));
        // Missing in LanB; must not borrow LanA's value
        assert_eq!(lan_b.uplink2, None);
        assert_eq!(lan_b.status.as_deref(), Some("down"));
    }

    #[test]
    fn test_missing_switch_id() {
        let config = parse_prp_config("LanA:\n  status: up\n");
        assert_eq!(config.switch_id, None);
        assert_eq!(config.lans.len(), 1);
        assert_eq!(config.lans[0].policy, None);
    }

    #[test]
    fn test_no_sections() {
        let config = parse_prp_config("Switch ID: 1\nPRP not enabled\n");
        assert_eq!(config.switch_id, Some(1));
        assert!(config.lans.is_empty());
    }
}
