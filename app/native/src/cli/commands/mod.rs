//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `config_cmd` - Configuration file commands
//! - `scroll` - Daemon, status and probe commands

use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config;
use crate::constants::APP_NAME;
use crate::error::TopscrollError;
use crate::schema;

pub mod config_cmd;
pub mod scroll;

pub use config_cmd::ConfigCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Topscroll - scroll whatever is under the pointer.
///
/// Runs the rerouting daemon when called without a subcommand.
#[derive(Parser, Debug)]
#[command(name = "topscroll")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the scroll rerouting daemon.
    ///
    /// Installs the event tap and keeps running until terminated. This is
    /// what happens when `topscroll` is called without a subcommand.
    Run,

    /// Show whether rerouting can work on this machine.
    Status {
        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Show how a scroll at a screen position would be routed.
    ///
    /// Walks the accessibility tree from the element under the position and
    /// prints every hop. Without coordinates the pointer position is used.
    #[command(after_long_help = r#"Examples:
  topscroll probe                  # Probe under the pointer
  topscroll probe --x 400 --y 300  # Probe a screen position
  topscroll probe --json           # Machine-readable output"#)]
    Probe {
        /// Horizontal screen coordinate.
        #[arg(long, allow_negative_numbers = true)]
        x: Option<f64>,

        /// Vertical screen coordinate.
        #[arg(long, allow_negative_numbers = true)]
        y: Option<f64>,

        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Configuration file management commands.
    ///
    /// Initialize, view, and manage the configuration file.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output Topscroll configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(topscroll completions --shell zsh)"
    ///   topscroll completions --shell fish > ~/.config/fish/completions/topscroll.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<std::path::PathBuf> {
        self.config.as_ref().map(std::path::PathBuf::from)
    }

    /// Returns whether this invocation runs the daemon.
    #[must_use]
    pub const fn runs_daemon(&self) -> bool { matches!(self.command, None | Some(Commands::Run)) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), TopscrollError> {
        if let Some(path_buf) = self.config_path() {
            // `config init --path` may legitimately point at a new file.
            let creating = matches!(self.command, Some(Commands::Config(ConfigCommands::Init { .. })));
            if !creating && !path_buf.exists() {
                return Err(TopscrollError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path_buf.display()
                )));
            }
            config::set_custom_config_path(path_buf);
        }

        match &self.command {
            None | Some(Commands::Run) => scroll::run(),
            Some(Commands::Status { json }) => scroll::status(*json),
            Some(Commands::Probe { x, y, json }) => scroll::probe(*x, *y, *json),
            Some(Commands::Config(cmd)) => config_cmd::execute(cmd),
            Some(Commands::Schema) => {
                println!("{}", schema::print_schema());
                Ok(())
            }
            Some(Commands::Completions { shell }) => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, APP_NAME, &mut io::stdout());
    }
}
