//! Remote command execution on ESXi hosts
//!
//! The orchestrator only needs "run this command string, give me stdout,
//! stderr and the exit status, within a timeout". [`CommandChannel`] is that
//! seam; [`SshConnector`] opens real channels, tests plug in scripted ones.

mod ssh;

pub use ssh::{SshChannel, SshConnector, SshSettings};

use crate::error::ChannelError;
use async_trait::async_trait;
use std::time::Duration;

/// Captured output of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// An open command session to one host
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Run a command and wait at most `timeout` for it to finish
    async fn execute(&self, command: &str, timeout: Duration) -> Result<CommandOutput, ChannelError>;

    /// Close the session; further commands fail with [`ChannelError::Closed`]
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Opens command channels by host address
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Box<dyn CommandChannel>, ChannelError>;
}
