// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sshrun")]
#[command(about = "Run commands on remote hosts over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print command output and errors
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to sshrun.yml (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a batch of shell commands and print their combined output
    Run {
        /// Host alias from the config, or [user@]host[:port]
        target: String,

        /// Commands to run, in order, as one shell invocation
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        commands: Vec<String>,

        /// Stop at the first failing command (join with && instead of ;)
        #[arg(long)]
        and_then: bool,
    },

    /// Run one command interactively over the local terminal
    Stream {
        /// Host alias from the config, or [user@]host[:port]
        target: String,

        /// Command to run
        command: String,
    },

    /// Connect, open a session and disconnect
    Check {
        /// Host alias from the config, or [user@]host[:port]
        target: String,
    },
}
