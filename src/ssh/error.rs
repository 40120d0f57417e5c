// ABOUTME: SSH-specific error types.
// ABOUTME: Covers trust store, connection, session, PTY, pipe and execution failures.

use super::ExitStatus;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("known_hosts store {path} unusable: {reason}")]
    TrustStore { path: PathBuf, reason: String },

    #[error("host key for {host}:{port} is not in known_hosts")]
    UnknownHostKey { host: String, port: u16 },

    #[error("host key for {host}:{port} does not match known_hosts line {line}")]
    HostKeyMismatch { host: String, port: u16, line: usize },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("authentication failed: password rejected for {0}")]
    AuthenticationFailed(String),

    #[error("failed to open session channel: {0}")]
    Session(String),

    #[error("pseudo-terminal request failed: {0}")]
    Pty(String),

    #[error("local stream error: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("command execution failed: {0}")]
    Execution(String),

    #[error("no commands to run")]
    EmptyBatch,

    #[error("remote command exited with {status}")]
    CommandFailed {
        status: ExitStatus,
        /// Output captured before the failure; may be incomplete.
        partial_output: Vec<u8>,
    },

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("command cancelled")]
    Cancelled,

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit status of the remote command, if the error carries one.
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        match self {
            Error::CommandFailed { status, .. } => Some(status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
