// ABOUTME: Entry point for the sshrun CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use sshrun::config::Config;
use sshrun::error::Result;
use sshrun::output::{Output, OutputMode};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    // Ctrl-C cancels the running command instead of killing the process
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let code = match run(cli, &mut output, cancel).await {
        Ok(()) => 0,
        Err(e) => {
            let code = e.exit_code();
            output.error(&e.to_string(), Some(code));
            code
        }
    };

    // Exit explicitly so a pending stdin read cannot hold the runtime open
    std::process::exit(code);
}

async fn run(cli: Cli, output: &mut Output, cancel: CancellationToken) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = env::current_dir()?;
            Config::discover_or_default(&cwd)?
        }
    };

    match cli.command {
        Commands::Run {
            target,
            commands,
            and_then,
        } => commands::run(&config, &target, &commands, and_then, output, cancel).await,
        Commands::Stream { target, command } => {
            commands::stream(&config, &target, &command, output, cancel).await
        }
        Commands::Check { target } => commands::check(&config, &target, output).await,
    }
}
