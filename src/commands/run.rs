// ABOUTME: Run command implementation.
// ABOUTME: Executes a batch of shell commands on one host and prints the captured output.

use super::emit_warnings;
use sshrun::config::Config;
use sshrun::diagnostics::{Diagnostics, Warning};
use sshrun::error::Result;
use sshrun::output::Output;
use sshrun::ssh::{self, JoinPolicy, Transport};
use tokio_util::sync::CancellationToken;

/// Run `commands` on `target` as a single compound command.
pub async fn run(
    config: &Config,
    target: &str,
    commands: &[String],
    and_then: bool,
    output: &mut Output,
    cancel: CancellationToken,
) -> Result<()> {
    let mut diag = Diagnostics::default();
    let mut options = config.batch_options(&mut diag).cancel_on(cancel);
    if and_then {
        options = options.join(JoinPolicy::AndThen);
    }

    let params = config.connection_params(target)?;
    output.progress(&format!("  → Connecting to {}...", params.address));
    output.start_timer();

    let transport = Transport::connect(params).await?;
    let result = match transport.open_session().await {
        Ok(session) => {
            output.progress(&format!("  → Running {} command(s)...", commands.len()));
            session.run_commands(commands, &options).await
        }
        Err(e) => Err(e),
    };

    match &result {
        Ok(bytes) => output.command_output(transport.host(), bytes),
        Err(ssh::Error::CommandFailed { partial_output, .. }) => {
            output.command_output(transport.host(), partial_output)
        }
        Err(_) => {}
    }

    // Disconnect SSH transport (non-fatal if it fails)
    let host = transport.host().to_string();
    if let Err(e) = transport.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            host, e
        )));
    }
    emit_warnings(&diag, output);

    result?;
    output.success(&format!("  ✓ Commands finished on {}", host));
    Ok(())
}
