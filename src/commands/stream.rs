// ABOUTME: Stream command implementation.
// ABOUTME: Runs one interactive command with the local terminal wired to the remote PTY.

use sshrun::config::Config;
use sshrun::error::Result;
use sshrun::output::Output;
use sshrun::ssh::{StreamOptions, start_session};
use tokio_util::sync::CancellationToken;

/// Stream `command` on `target` over stdin/stdout until it exits or is cancelled.
pub async fn stream(
    config: &Config,
    target: &str,
    command: &str,
    output: &mut Output,
    cancel: CancellationToken,
) -> Result<()> {
    let params = config.connection_params(target)?;
    output.progress(&format!("  → Connecting to {}...", params.address));
    output.start_timer();

    // The session owns its transport and disconnects it when the stream ends
    let session = start_session(params).await?;
    let options = StreamOptions::default().cancel_on(cancel);
    let status = session.stream_local(command, &options).await?;

    output.success(&format!("  ✓ {} finished with {}", command, status));
    Ok(())
}
