//! CLI module for Topscroll.
//!
//! Parses the command line, sets up logging and dispatches to the command
//! handlers. Running without a subcommand starts the rerouting daemon.

mod commands;
mod output;

use clap::Parser;
pub use commands::{Cli, Commands, ConfigCommands};
use tracing_subscriber::EnvFilter;

use crate::constants::LOG_ENV_VAR;
use crate::error::TopscrollError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), TopscrollError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.execute()
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second initialization (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
