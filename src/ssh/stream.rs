// ABOUTME: Interactive streaming of one command between local streams and a session.
// ABOUTME: Single select loop with fixed-size reads so completion and cancellation are seen promptly.

use super::channel::{ChannelEvent, ExitStatus, RemoteChannel, TERMINAL_MODES};
use super::error::{Error, Result};
use super::session::Session;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Stdin, Stdout};
use tokio_util::sync::CancellationToken;

const READ_BUF_SIZE: usize = 8192;

/// Options for [`Session::stream_command`].
#[derive(Debug, Default, Clone)]
pub struct StreamOptions {
    /// Upper bound on the whole command; none by default.
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl StreamOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// The calling process's stdin and stdout.
pub struct LocalTerminal {
    pub stdin: Stdin,
    pub stdout: Stdout,
}

impl LocalTerminal {
    pub fn new() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for LocalTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Session<'_> {
    /// Run `command` under a PTY, forwarding `input` to it and its output
    /// to `output` until it exits or the options' token is cancelled.
    ///
    /// The session is closed before this returns.
    pub async fn stream_command<R, W>(
        mut self,
        command: &str,
        input: R,
        output: W,
        options: &StreamOptions,
    ) -> Result<ExitStatus>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let result = self.stream_inner(command, input, output, options).await;
        self.close_after(result).await
    }

    /// [`Session::stream_command`] over the process's own stdin and stdout.
    pub async fn stream_local(self, command: &str, options: &StreamOptions) -> Result<ExitStatus> {
        let terminal = LocalTerminal::new();
        self.stream_command(command, terminal.stdin, terminal.stdout, options)
            .await
    }

    async fn stream_inner<R, W>(
        &mut self,
        command: &str,
        input: R,
        output: W,
        options: &StreamOptions,
    ) -> Result<ExitStatus>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let channel = self.channel.as_mut();
        let cancel = options.cancel.clone();

        let run = async move {
            channel.request_pty(TERMINAL_MODES).await?;
            channel.exec(command).await?;
            tracing::debug!(command, "streaming command");
            pump(channel, input, output, &cancel).await
        };

        let status = match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, run)
                .await
                .map_err(|_| Error::CommandTimeout(timeout))??,
            None => run.await?,
        };

        if status.success() {
            Ok(status)
        } else {
            Err(Error::CommandFailed {
                status,
                partial_output: Vec::new(),
            })
        }
    }
}

/// Shuttle bytes both ways until the remote command completes.
async fn pump<R, W>(
    channel: &mut dyn RemoteChannel,
    mut input: R,
    mut output: W,
    cancel: &CancellationToken,
) -> Result<ExitStatus>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut input_closed = false;
    let mut status = None;
    let mut got_eof = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("stream cancelled");
                return Err(Error::Cancelled);
            }

            event = channel.next_event() => {
                match event {
                    Some(ChannelEvent::Data(data)) | Some(ChannelEvent::ExtendedData { data, .. }) => {
                        output.write_all(&data).await.map_err(Error::Pipe)?;
                        output.flush().await.map_err(Error::Pipe)?;
                    }
                    Some(ChannelEvent::Exit(exit)) => {
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

            r = input.read(&mut buf), if !input_closed => {
                match r {
                    Ok(0) => {
                        input_closed = true;
                        channel.eof().await?;
                    }
                    Ok(n) => channel.send(&buf[..n]).await?,
                    Err(e) => return Err(Error::Pipe(e)),
                }
            }
        }
    }

    output.flush().await.map_err(Error::Pipe)?;
    let status = status.ok_or(Error::ChannelClosed)?;
    tracing::debug!(status = %status, "stream finished");
    Ok(status)
}
