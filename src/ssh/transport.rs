// ABOUTME: SSH transport management using russh.
// ABOUTME: Resolves host key trust, connects, authenticates with a password, opens sessions.

use super::error::{Error, Result};
use super::params::ConnectionParams;
use super::session::Session;
use super::trust::TrustStore;
use russh::client::{self, Config, Handle};
use russh::keys::ssh_key;
use russh::Disconnect;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

/// Keepalive probe interval; the connection drops after
/// `KEEPALIVE_MAX` unanswered probes rather than after plain silence.
pub(crate) const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
pub(crate) const KEEPALIVE_MAX: usize = 3;

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust: TrustStore,
}

impl client::Handler for SshHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        self.trust
            .verify(&self.host, self.port, server_public_key)
            .map(|()| true)
    }
}

/// An open, authenticated connection to one remote host.
pub struct Transport {
    params: ConnectionParams,
    host: String,
    port: u16,
    handle: Handle<SshHandler>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("params", &self.params)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Transport {
    /// Resolve the trust store, dial the host and authenticate.
    pub async fn connect(params: ConnectionParams) -> Result<Self> {
        // Trust comes first so a broken store fails before any network I/O
        let trust = TrustStore::resolve(params.known_hosts_path.as_deref(), params.trust_on_first_use)?;
        let (host, port) = params.host_port()?;

        let timeout = params.connect_timeout;
        match tokio::time::timeout(timeout, Self::dial(params, host, port, trust)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectTimeout(timeout)),
        }
    }

    async fn dial(
        params: ConnectionParams,
        host: String,
        port: u16,
        trust: TrustStore,
    ) -> Result<Self> {
        let russh_config = client_config();

        let handler = SshHandler {
            host: host.clone(),
            port,
            trust,
        };

        let mut handle = client::connect(Arc::new(russh_config), (host.as_str(), port), handler)
            .await
            .map_err(|e| match e {
                Error::Protocol(russh::Error::IO(io))
                    if io.kind() == std::io::ErrorKind::ConnectionRefused =>
                {
                    Error::Connection(format!("connection refused to {}:{}", host, port))
                }
                Error::Protocol(e) => Error::Connection(e.to_string()),
                Error::Io(e) => Error::Connection(e.to_string()),
                other => other,
            })?;
        tracing::debug!(host = %host, port, "connected");

        let result = handle
            .authenticate_password(params.user.as_str(), params.password.expose_secret().as_str())
            .await?;
        if !result.success() {
            return Err(Error::AuthenticationFailed(params.user.clone()));
        }
        tracing::debug!(host = %host, user = %params.user, "authenticated");

        Ok(Self {
            params,
            host,
            port,
            handle,
        })
    }

    /// Host this transport is connected to.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Open a new session channel. The session borrows the transport, so
    /// the transport cannot be disconnected while the session is alive.
    pub async fn open_session(&self) -> Result<Session<'_>> {
        let channel = self.open_channel().await?;
        Ok(Session::borrowed(Box::new(channel), self.params.command_timeout))
    }

    async fn open_channel(&self) -> Result<russh::Channel<client::Msg>> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Session(e.to_string()))?;
        tracing::debug!(host = %self.host, channel = ?channel.id(), "session channel opened");
        Ok(channel)
    }

    /// Disconnect the transport.
    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        tracing::debug!(host = %self.host, "disconnected");
        Ok(())
    }
}

/// russh client settings. Silent commands are bounded by the command
/// timeout, not by connection inactivity.
pub(crate) fn client_config() -> Config {
    Config {
        inactivity_timeout: None,
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: KEEPALIVE_MAX,
        ..Default::default()
    }
}

/// Connect and open a single session in one step.
///
/// The returned session owns its transport; closing the session also
/// disconnects the transport.
pub async fn start_session(params: ConnectionParams) -> Result<Session<'static>> {
    let transport = Transport::connect(params).await?;
    match transport.open_channel().await {
        Ok(channel) => {
            let timeout = transport.params.command_timeout;
            Ok(Session::owning(Box::new(channel), transport, timeout))
        }
        Err(e) => {
            if let Err(close_err) = transport.disconnect().await {
                tracing::warn!("disconnect after failed channel open: {}", close_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_connections_are_kept_alive() {
        let config = client_config();
        assert_eq!(config.inactivity_timeout, None);
        assert_eq!(config.keepalive_interval, Some(KEEPALIVE_INTERVAL));
        assert_eq!(config.keepalive_max, KEEPALIVE_MAX);
    }
}
