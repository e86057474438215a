//! Per-run host bookkeeping
//!
//! Tracks the state every host reached during one collection pass so the
//! coordinator can report collected and failed hosts at the end.

use crate::models::{HostFailure, HostRef};
use dashmap::DashMap;
use std::fmt;
use tracing::debug;

/// Per-host collection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostState {
    Pending,
    Connecting,
    Discovering,
    CollectingSwitches,
    CollectingPortsAndVdans,
    CollectingLansAndNodes,
    Done,
    Failed,
}

impl HostState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostState::Pending => "Pending",
            HostState::Connecting => "Connecting",
            HostState::Discovering => "Discovering",
            HostState::CollectingSwitches => "CollectingSwitches",
            HostState::CollectingPortsAndVdans => "CollectingPortsAndVdans",
            HostState::CollectingLansAndNodes => "CollectingLansAndNodes",
            HostState::Done => "Done",
            HostState::Failed => "Failed",
        }
    }

    /// `Done` and `Failed` absorb every later transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, HostState::Done | HostState::Failed)
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known state of one host
#[derive(Debug, Clone)]
pub struct HostStatus {
    pub host: HostRef,
    pub state: HostState,
    /// State the host was in when it failed
    pub failed_in: Option<HostState>,
    pub reason: Option<String>,
    pub switches: usize,
}

/// Registry of the hosts taking part in one pass
#[derive(Debug)]
pub struct HostRegistry {
    hosts: DashMap<String, HostStatus>,
    instance_id: String,
}

impl HostRegistry {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            hosts: DashMap::new(),
            instance_id: instance_id.into(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn register(&self, host: HostRef) {
        debug!(host = %host.name, instance = %self.instance_id, "Registering host");
        self.hosts.insert(
            host.name.clone(),
            HostStatus {
                host,
                state: HostState::Pending,
                failed_in: None,
                reason: None,
                switches: 0,
            },
        );
    }

    /// Move a host to a new state; returns false when the host is unknown or already terminal
    pub fn transition(&self, host: &str, state: HostState) -> bool {
        match self.hosts.get_mut(host) {
            Some(mut entry) if !entry.state.is_terminal() => {
                debug!(host = %host, from = %entry.state, to = %state, "Host transition");
                entry.state = state;
                true
            }
            _ => false,
        }
    }

    pub fn mark_done(&self, host: &str, switches: usize) {
        if let Some(mut entry) = self.hosts.get_mut(host) {
            entry.switches = switches;
        }
        self.transition(host, HostState::Done);
    }

    /// Move a host to `Failed`, remembering where it stopped
    pub fn mark_failed(&self, host: &str, reason: impl Into<String>) -> Option<HostState> {
        let mut entry = self.hosts.get_mut(host)?;
        if entry.state.is_terminal() {
            return None;
        }
        let failed_in = entry.state;
        entry.failed_in = Some(failed_in);
        entry.reason = Some(reason.into());
        entry.state = HostState::Failed;
        Some(failed_in)
    }

    pub fn get(&self, host: &str) -> Option<HostStatus> {
        self.hosts.get(host).map(|r| r.clone())
    }

    /// All hosts, ordered by name
    pub fn list(&self) -> Vec<HostStatus> {
        let mut hosts: Vec<HostStatus> = self.hosts.iter().map(|r| r.value().clone()).collect();
        hosts.sort_by(|a, b| a.host.name.cmp(&b.host.name));
        hosts
    }

    /// Names of the hosts that reached `Done`
    pub fn collected(&self) -> Vec<String> {
        self.list()
            .into_iter()
            .filter(|s| s.state == HostState::Done)
            .map(|s| s.host.name)
            .collect()
    }

    pub fn failures(&self) -> Vec<HostFailure> {
        self.list()
            .into_iter()
            .filter(|s| s.state == HostState::Failed)
            .map(|s| HostFailure {
                host: s.host.name,
                state: s.failed_in.unwrap_or(HostState::Pending).to_string(),
                reason: s.reason.unwrap_or_default(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> HostRef {
        HostRef {
            name: name.to_string(),
            resource_id: format!("r-{}", name),
            moid: format!("host-{}", name),
        }
    }

    #[test]
    fn test_register_and_transition() {
        let registry = HostRegistry::new("ai-1");
        registry.register(host("esx-01"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("esx-01").unwrap().state, HostState::Pending);

        assert!(registry.transition("esx-01", HostState::Connecting));
        assert!(!registry.transition("esx-99", HostState::Connecting));

        registry.mark_done("esx-01", 2);
        let status = registry.get("esx-01").unwrap();
        assert_eq!(status.state, HostState::Done);
        assert_eq!(status.switches, 2);
        assert_eq!(registry.collected(), vec!["esx-01".to_string()]);
    }

    #[test]
    fn test_failed_is_absorbing() {
        let registry = HostRegistry::new("ai-1");
        registry.register(host("esx-02"));
        registry.transition("esx-02", HostState::CollectingPortsAndVdans);

        let failed_in = registry.mark_failed("esx-02", "timed out");
        assert_eq!(failed_in, Some(HostState::CollectingPortsAndVdans));
        assert!(!registry.transition("esx-02", HostState::Done));
        assert_eq!(registry.mark_failed("esx-02", "again"), None);

        let failures = registry.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].state, "CollectingPortsAndVdans");
        assert_eq!(failures[0].reason, "timed out");
        assert!(registry.collected().is_empty());
    }
}
