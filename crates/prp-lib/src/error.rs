//! Error types for each collection boundary

use std::time::Duration;
use thiserror::Error;

/// Transport failures on the remote command channel; fatal for the host
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("authentication failed for {user}@{address}")]
    Auth { user: String, address: String },

    #[error("command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("ssh error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("i/o error on channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel task failed: {0}")]
    Task(String),

    #[error("channel is closed")]
    Closed,
}

/// Failures of the external inventory provider
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inventory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid inventory url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to decode inventory response: {0}")]
    Decode(String),

    #[error("inventory object {0} is missing field {1}")]
    MissingField(String, &'static str),
}

/// A record-level parse failure; the record is skipped, parsing continues
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{command}: line {line_no}: {reason}: {line:?}")]
pub struct ParseError {
    pub command: &'static str,
    pub line_no: usize,
    pub line: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(
        command: &'static str,
        line_no: usize,
        line: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            command,
            line_no,
            line: line.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that move one host to the failed state
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host {0} has no management address")]
    NoAddress(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Errors that end a whole collection pass
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("no hosts could be resolved for adapter instance {0}")]
    NoHosts(String),

    #[error("inventory unavailable: {0}")]
    Inventory(#[from] InventoryError),
}
