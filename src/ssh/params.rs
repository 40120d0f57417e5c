// ABOUTME: Connection parameters for establishing an SSH transport.
// ABOUTME: Plain value type; nothing here touches the network.

use super::error::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22;

/// Parameters for establishing an SSH transport.
#[derive(Debug)]
pub struct ConnectionParams {
    /// Remote address in `host` or `host:port` form.
    pub address: String,
    /// Username for authentication.
    pub user: String,
    /// Password for authentication.
    pub password: SecretString,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Whether to accept and record unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Timeout for dialing and authenticating (default: 30 seconds).
    pub connect_timeout: Duration,
    /// Timeout for batch command execution (default: 5 minutes).
    pub command_timeout: Duration,
}

impl ConnectionParams {
    /// Store connection parameters. No validation happens here; a bad
    /// address surfaces as a connection error at connect time.
    pub fn configure(
        address: impl Into<String>,
        user: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            address: address.into(),
            user: user.into(),
            password,
            known_hosts_path: None,
            trust_on_first_use: false,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(300), // 5 minutes
        }
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Split the address into host and port.
    pub fn host_port(&self) -> Result<(String, u16)> {
        split_address(&self.address)
    }
}

/// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
pub fn split_address(address: &str) -> Result<(String, u16)> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::Connection("address cannot be empty".to_string()));
    }

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| Error::Connection(format!("unterminated '[' in {}", address)))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => parse_port(port)?,
            None if tail.is_empty() => DEFAULT_PORT,
            None => return Err(Error::Connection(format!("invalid address: {}", address))),
        };
        return Ok((host.to_string(), port));
    }

    // A bare IPv6 address has several colons and no port.
    if address.matches(':').count() > 1 {
        return Ok((address.to_string(), DEFAULT_PORT));
    }

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, parse_port(port)?),
        None => (address, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(Error::Connection("hostname cannot be empty".to_string()));
    }

    Ok((host.to_string(), port))
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| Error::Connection(format!("invalid port: {}", port)))
}
