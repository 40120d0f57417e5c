// ABOUTME: Command module aggregator for the sshrun CLI.
// ABOUTME: Re-exports run, stream, and check command handlers.

mod check;
mod run;
mod stream;

pub use check::check;
pub use run::run;
pub use stream::stream;

use sshrun::diagnostics::Diagnostics;
use sshrun::output::Output;

/// Print collected warnings.
fn emit_warnings(diag: &Diagnostics, output: &Output) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}
