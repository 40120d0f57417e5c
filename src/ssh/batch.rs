// ABOUTME: Batch execution of shell commands over a session.
// ABOUTME: Joins commands into one compound command and captures all output.

use super::channel::{ChannelEvent, RemoteChannel, TERMINAL_MODES};
use super::error::{Error, Result};
use super::prompt::{LineScanner, PromptResponder};
use super::session::Session;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How commands in a batch are chained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// `a; b`: every command runs; the batch status is the last command's.
    #[default]
    Sequential,
    /// `a && b`: stop at the first failing command.
    AndThen,
}

impl JoinPolicy {
    fn separator(self) -> &'static str {
        match self {
            JoinPolicy::Sequential => "; ",
            JoinPolicy::AndThen => " && ",
        }
    }

    /// Join commands into a single shell command, preserving order.
    pub fn join<S: AsRef<str>>(self, commands: &[S]) -> String {
        commands
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(self.separator())
    }
}

/// Options for [`Session::run_commands`].
#[derive(Debug, Default)]
pub struct BatchOptions {
    pub join: JoinPolicy,
    pub prompts: Vec<PromptResponder>,
    /// Overrides the session's command timeout.
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl BatchOptions {
    pub fn join(mut self, join: JoinPolicy) -> Self {
        self.join = join;
        self
    }

    pub fn respond(mut self, responder: PromptResponder) -> Self {
        self.prompts.push(responder);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

impl Session<'_> {
    /// Run `commands` as one compound command under a PTY and return
    /// everything the remote side wrote, in arrival order.
    ///
    /// The session is closed on every path.
    pub async fn run_commands<S: AsRef<str>>(
        mut self,
        commands: &[S],
        options: &BatchOptions,
    ) -> Result<Vec<u8>> {
        let result = self.run_batch(commands, options).await;
        self.close_after(result).await
    }

    async fn run_batch<S: AsRef<str>>(
        &mut self,
        commands: &[S],
        options: &BatchOptions,
    ) -> Result<Vec<u8>> {
        if commands.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let timeout = options.timeout.unwrap_or(self.command_timeout);
        let command = options.join.join(commands);
        let channel = self.channel.as_mut();

        let run = async move {
            channel.request_pty(TERMINAL_MODES).await?;
            tracing::debug!(commands = commands.len(), "PTY granted, executing batch");
            channel.exec(&command).await?;
            drain(channel, &options.prompts).await
        };

        tokio::select! {
            biased;
            _ = options.cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(timeout, run) => match result {
                Ok(result) => result,
                Err(_) => Err(Error::CommandTimeout(timeout)),
            },
        }
    }
}

/// Read the channel to completion, answering prompts along the way.
async fn drain(channel: &mut dyn RemoteChannel, prompts: &[PromptResponder]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut scanner = LineScanner::default();
    let mut status = None;
    let mut got_eof = false;

    loop {
        match channel.next_event().await {
            Some(ChannelEvent::Data(data)) | Some(ChannelEvent::ExtendedData { data, .. }) => {
                output.extend_from_slice(&data);
                for reply in scanner.feed(&data, prompts) {
                    channel.send(&reply).await?;
                }
            }
            Some(ChannelEvent::Exit(exit)) => {
                tracing::debug!(status = %exit, "batch finished");
                status = Some(exit);
                if got_eof {
                    break;
                }
            }
            Some(ChannelEvent::Eof) => {
                got_eof = true;
                if status.is_some() {
                    break;
                }
            }
            Some(ChannelEvent::Close) | None => break,
        }
    }

    match status {
        None => Err(Error::ChannelClosed),
        Some(status) if status.success() => Ok(output),
        Some(status) => Err(Error::CommandFailed {
            status,
            partial_output: output,
        }),
    }
}
