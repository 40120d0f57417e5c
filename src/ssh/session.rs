// ABOUTME: A single command channel over an SSH transport.
// ABOUTME: Ties the channel's lifetime to its transport and closes it exactly once.

use super::channel::RemoteChannel;
use super::error::Result;
use super::transport::Transport;
use std::marker::PhantomData;
use std::time::Duration;

/// One session channel, consumed by a batch run or a stream.
///
/// Sessions opened with [`Transport::open_session`] borrow the transport.
/// Sessions from [`super::start_session`] own it and disconnect it on close.
pub struct Session<'t> {
    pub(crate) channel: Box<dyn RemoteChannel>,
    pub(crate) command_timeout: Duration,
    owned: Option<Transport>,
    _transport: PhantomData<&'t Transport>,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channel", &"<channel>")
            .field("command_timeout", &self.command_timeout)
            .field("owns_transport", &self.owned.is_some())
            .finish()
    }
}

impl<'t> Session<'t> {
    pub(crate) fn borrowed(channel: Box<dyn RemoteChannel>, command_timeout: Duration) -> Self {
        Self {
            channel,
            command_timeout,
            owned: None,
            _transport: PhantomData,
        }
    }
}

impl Session<'static> {
    pub(crate) fn owning(
        channel: Box<dyn RemoteChannel>,
        transport: Transport,
        command_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            command_timeout,
            owned: Some(transport),
            _transport: PhantomData,
        }
    }

    /// Wrap a channel created elsewhere. The caller keeps responsibility for
    /// whatever connection backs it.
    pub fn from_channel(channel: Box<dyn RemoteChannel>, command_timeout: Duration) -> Self {
        Self::borrowed(channel, command_timeout)
    }
}

impl Session<'_> {
    /// Close the channel, and the transport too if this session owns it.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.channel.close().await;
        if let Some(transport) = self.owned.take() {
            let disconnected = transport.disconnect().await;
            closed?;
            return disconnected;
        }
        closed
    }

    /// Close after a failed operation, keeping the original error.
    pub(crate) async fn close_after<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => self.close().await.map(|()| value),
            Err(e) => {
                if let Err(close_err) = self.close().await {
                    tracing::warn!("failed to close session after error: {}", close_err);
                }
                Err(e)
            }
        }
    }
}
