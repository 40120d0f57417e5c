// ABOUTME: SSH client module for remote command execution.
// ABOUTME: Password authentication with known_hosts verification, batch runs and interactive streams.

mod batch;
mod channel;
mod error;
mod params;
mod prompt;
mod session;
mod stream;
mod transport;
mod trust;

pub use batch::{BatchOptions, JoinPolicy};
pub use channel::{ChannelEvent, ExitStatus, RemoteChannel, TERMINAL_MODES};
pub use error::{Error, Result};
pub use params::{ConnectionParams, DEFAULT_PORT, split_address};
pub use prompt::PromptResponder;
pub use session::Session;
pub use stream::{LocalTerminal, StreamOptions};
pub use transport::{Transport, start_session};
pub use trust::{TrustStore, default_known_hosts_path};
