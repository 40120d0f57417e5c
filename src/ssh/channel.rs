// ABOUTME: Channel abstraction used by the batch executor and the streamer.
// ABOUTME: Implemented for russh session channels; tests drive it with a scripted fake.

use super::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use russh::client::Msg;
use russh::{Channel, ChannelMsg, Pty, Sig};
use std::fmt;

/// PTY request sent before every command: echo off, 14.4 kbaud both ways.
pub const TERMINAL_MODES: &[(Pty, u32)] = &[
    (Pty::ECHO, 0),
    (Pty::TTY_OP_ISPEED, 14400),
    (Pty::TTY_OP_OSPEED, 14400),
];

/// Terminal type requested for the PTY.
pub const TERM: &str = "xterm";
pub const TERM_COLS: u32 = 80;
pub const TERM_ROWS: u32 = 40;

/// How a remote command finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Code(u32),
    Signal(String),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }

    /// Exit code suitable for a local process, shell style: signals map to
    /// 128 + the signal number, or plain 128 when the number is unknown.
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Code(code) => i32::try_from(*code).unwrap_or(i32::MAX),
            ExitStatus::Signal(name) => 128 + signal_number(name).unwrap_or(0),
        }
    }
}

/// POSIX number of a signal given by its SSH name (`TERM`, `KILL`, ...).
fn signal_number(name: &str) -> Option<i32> {
    let number = match name {
        "HUP" => 1,
        "INT" => 2,
        "QUIT" => 3,
        "ILL" => 4,
        "ABRT" => 6,
        "FPE" => 8,
        "KILL" => 9,
        "USR1" => 10,
        "SEGV" => 11,
        "USR2" => 12,
        "PIPE" => 13,
        "ALRM" => 14,
        "TERM" => 15,
        _ => return None,
    };
    Some(number)
}

/// SSH signal name without the `SIG` prefix.
fn signal_name(sig: &Sig) -> String {
    let name = match sig {
        Sig::ABRT => "ABRT",
        Sig::ALRM => "ALRM",
        Sig::FPE => "FPE",
        Sig::HUP => "HUP",
        Sig::ILL => "ILL",
        Sig::INT => "INT",
        Sig::KILL => "KILL",
        Sig::PIPE => "PIPE",
        Sig::QUIT => "QUIT",
        Sig::SEGV => "SEGV",
        Sig::TERM => "TERM",
        Sig::USR1 => "USR1",
        Sig::Custom(name) => name.trim_start_matches("SIG"),
    };
    name.to_string()
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "exit code {}", code),
            ExitStatus::Signal(name) => write!(f, "signal {}", name),
        }
    }
}

/// Events observed on a session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Bytes from the remote standard output.
    Data(Bytes),
    /// Bytes from an extended stream (ext 1 is standard error).
    ExtendedData { data: Bytes, ext: u32 },
    Exit(ExitStatus),
    Eof,
    Close,
}

/// Operations on one session channel.
#[async_trait]
pub trait RemoteChannel: Send {
    /// Request a pseudo-terminal and wait for the server's answer.
    async fn request_pty(&mut self, modes: &[(Pty, u32)]) -> Result<()>;

    /// Start `command` and wait for the server to accept it.
    async fn exec(&mut self, command: &str) -> Result<()>;

    /// Write bytes to the remote standard input.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Signal end of the remote standard input.
    async fn eof(&mut self) -> Result<()>;

    /// Close the channel.
    async fn close(&mut self) -> Result<()>;

    /// Next event, or None once the channel is gone.
    async fn next_event(&mut self) -> Option<ChannelEvent>;
}

/// Outcome of a request sent with `want_reply`.
enum Reply {
    Success,
    Failure,
    Gone,
}

async fn wait_reply(channel: &mut Channel<Msg>) -> Reply {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => return Reply::Success,
            Some(ChannelMsg::Failure) => return Reply::Failure,
            Some(ChannelMsg::Close) | None => return Reply::Gone,
            Some(_) => {}
        }
    }
}

#[async_trait]
impl RemoteChannel for Channel<Msg> {
    async fn request_pty(&mut self, modes: &[(Pty, u32)]) -> Result<()> {
        Channel::request_pty(self, true, TERM, TERM_COLS, TERM_ROWS, 0, 0, modes)
            .await
            .map_err(|e| Error::Pty(e.to_string()))?;
        match wait_reply(self).await {
            Reply::Success => Ok(()),
            Reply::Failure => Err(Error::Pty("server refused PTY allocation".to_string())),
            Reply::Gone => Err(Error::ChannelClosed),
        }
    }

    async fn exec(&mut self, command: &str) -> Result<()> {
        Channel::exec(self, true, command)
            .await
            .map_err(|e| Error::Execution(format!("failed to exec command: {}", e)))?;
        match wait_reply(self).await {
            Reply::Success => Ok(()),
            Reply::Failure => Err(Error::Execution("server refused exec request".to_string())),
            Reply::Gone => Err(Error::ChannelClosed),
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.data(data).await.map_err(Error::Protocol)
    }

    async fn eof(&mut self) -> Result<()> {
        Channel::eof(self).await.map_err(Error::Protocol)
    }

    async fn close(&mut self) -> Result<()> {
        Channel::close(self).await.map_err(Error::Protocol)
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = match self.wait().await? {
                ChannelMsg::Data { data } => ChannelEvent::Data(Bytes::copy_from_slice(&data)),
                ChannelMsg::ExtendedData { data, ext } => ChannelEvent::ExtendedData {
                    data: Bytes::copy_from_slice(&data),
                    ext,
                },
                ChannelMsg::ExitStatus { exit_status } => {
                    ChannelEvent::Exit(ExitStatus::Code(exit_status))
                }
                ChannelMsg::ExitSignal {
                    signal_name: sig, ..
                } => ChannelEvent::Exit(ExitStatus::Signal(signal_name(&sig))),
                ChannelMsg::Eof => ChannelEvent::Eof,
                ChannelMsg::Close => ChannelEvent::Close,
                _ => continue,
            };
            return Some(event);
        }
    }
}
