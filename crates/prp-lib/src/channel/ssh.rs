//! SSH command channel backed by `ssh2`
//!
//! `ssh2` is blocking, so every session call runs on the blocking pool and is
//! bounded by a tokio timeout.

use super::{ChannelConnector, CommandChannel, CommandOutput};
use crate::error::ChannelError;
use async_trait::async_trait;
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Connection parameters shared by every host
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
}

/// Opens password-authenticated SSH sessions
#[derive(Debug, Clone)]
pub struct SshConnector {
    settings: SshSettings,
}

impl SshConnector {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }
}

/// Session timeouts are `u32` milliseconds; longer durations saturate
fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

fn open_session(address: &str, settings: &SshSettings) -> Result<Session, ChannelError> {
    let target = format!("{}:{}", address, settings.port);
    let socket = target
        .to_socket_addrs()
        .map_err(|source| ChannelError::Connect {
            address: target.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| ChannelError::Connect {
            address: target.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "address did not resolve"),
        })?;

    let tcp = TcpStream::connect_timeout(&socket, settings.connect_timeout).map_err(|source| {
        ChannelError::Connect {
            address: target.clone(),
            source,
        }
    })?;

    let mut session = Session::new()?;
    session.set_timeout(timeout_millis(settings.connect_timeout));
    session.set_tcp_stream(tcp);
    session.handshake()?;

    if session
        .userauth_password(&settings.username, &settings.password)
        .is_err()
        || !session.authenticated()
    {
        return Err(ChannelError::Auth {
            user: settings.username.clone(),
            address: target,
        });
    }

    Ok(session)
}

#[async_trait]
impl ChannelConnector for SshConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn CommandChannel>, ChannelError> {
        let settings = self.settings.clone();
        let owned = address.to_string();
        let deadline = settings.connect_timeout;

        let handle = tokio::task::spawn_blocking(move || open_session(&owned, &settings));
        let session = match tokio::time::timeout(deadline, handle).await {
            Ok(joined) => joined.map_err(|e| ChannelError::Task(e.to_string()))??,
            Err(_) => {
                return Err(ChannelError::Timeout {
                    command: format!("connect {}", address),
                    timeout: deadline,
                })
            }
        };

        info!(host = %address, "SSH session established");
        Ok(Box::new(SshChannel {
            address: address.to_string(),
            session: Arc::new(Mutex::new(Some(session))),
        }))
    }
}

/// One authenticated SSH session
pub struct SshChannel {
    address: String,
    session: Arc<Mutex<Option<Session>>>,
}

fn run_command(
    session: &Mutex<Option<Session>>,
    command: &str,
    timeout: Duration,
) -> Result<CommandOutput, ChannelError> {
    let guard = session
        .lock()
        .map_err(|_| ChannelError::Task("session lock poisoned".to_string()))?;
    let session = guard.as_ref().ok_or(ChannelError::Closed)?;
    session.set_timeout(timeout_millis(timeout));

    let mut channel = session.channel_session()?;
    channel.exec(command)?;

    let mut stdout = String::new();
    channel.read_to_string(&mut stdout)?;
    let mut stderr = String::new();
    channel.stderr().read_to_string(&mut stderr)?;

    channel.wait_close()?;
    let exit_status = channel.exit_status()?;

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_status,
    })
}

#[async_trait]
impl CommandChannel for SshChannel {
    async fn execute(&self, command: &str, timeout: Duration) -> Result<CommandOutput, ChannelError> {
        let session = Arc::clone(&self.session);
        let owned = command.to_string();

        debug!(host = %self.address, command, "Running command");
        let handle = tokio::task::spawn_blocking(move || run_command(&session, &owned, timeout));
        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => joined.map_err(|e| ChannelError::Task(e.to_string()))?,
            Err(_) => Err(ChannelError::Timeout {
                command: command.to_string(),
                timeout,
            }),
        }
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let session = Arc::clone(&self.session);
        let address = self.address.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = session
                .lock()
                .map_err(|_| ChannelError::Task("session lock poisoned".to_string()))?;
            if let Some(session) = guard.take() {
                session.disconnect(None, "collection finished", None)?;
                debug!(host = %address, "SSH session closed");
            }
            Ok::<(), ChannelError>(())
        })
        .await
        .map_err(|e| ChannelError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SshSettings {
        SshSettings {
            port: 1,
            username: "root".to_string(),
            password: "secret".to_string(),
            connect_timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_secs(60)), 60_000);
        assert_eq!(timeout_millis(Duration::from_secs(5_000_000)), u32::MAX);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        let connector = SshConnector::new(settings());

        let err = connector.connect("127.0.0.1").await.err().unwrap();
        assert!(matches!(
            err,
            ChannelError::Connect { .. } | ChannelError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_commands() {
        let channel = SshChannel {
            address: "esx-01".to_string(),
            session: Arc::new(Mutex::new(None)),
        };

        channel.close().await.unwrap();
        let err = channel
            .execute("nsxdp-cli ens switch list", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }
}
