// ABOUTME: Check command implementation.
// ABOUTME: Verifies trust, authentication and channel setup without running anything.

use super::emit_warnings;
use sshrun::config::Config;
use sshrun::diagnostics::{Diagnostics, Warning};
use sshrun::error::Result;
use sshrun::output::Output;
use sshrun::ssh::Transport;

/// Connect to `target`, open and close one session, then disconnect.
pub async fn check(config: &Config, target: &str, output: &mut Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let params = config.connection_params(target)?;
    output.progress(&format!("  → Connecting to {}...", params.address));
    output.start_timer();

    let transport = Transport::connect(params).await?;
    output.progress("  → Opening session...");
    let opened = match transport.open_session().await {
        Ok(session) => session.close().await,
        Err(e) => Err(e),
    };

    let host = transport.host().to_string();
    if let Err(e) = transport.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            host, e
        )));
    }
    emit_warnings(&diag, output);

    opened?;
    output.success(&format!("  ✓ {} is reachable and accepts the credentials", host));
    Ok(())
}
