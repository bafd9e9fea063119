//! Config CLI commands.
//!
//! Commands for managing the Topscroll configuration file.

use std::path::PathBuf;

use clap::Subcommand;

use crate::cli::output::print_highlighted_json;
use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{self, ConfigError, TopscrollConfig, config_paths};
use crate::error::TopscrollError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Initialize a new configuration file with all options documented.
    ///
    /// Creates a new configuration file at the default location with all
    /// available options commented out.
    #[command(
        name = "init",
        after_long_help = r#"Examples:
  topscroll config init              # Create config at default location
  topscroll config init --force      # Overwrite existing config
  topscroll config init --path ~/my-config.jsonc  # Create at custom path
  topscroll config init --stdout     # Print template to stdout"#
    )]
    Init {
        /// Overwrite existing configuration file if it exists.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        /// If not specified, uses ~/.config/topscroll/config.jsonc
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the configuration template to stdout instead of writing to a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show the path to the configuration file.
    ///
    /// Displays the paths where Topscroll looks for configuration files,
    /// and indicates which one is currently in use (if any).
    Path,

    /// Show the effective configuration.
    ///
    /// Loads the active configuration file, applies defaults and range
    /// clamping, and prints the result as JSON.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands) -> Result<(), TopscrollError> {
    match cmd {
        ConfigCommands::Init { force, path, stdout } => {
            if *stdout {
                println!("{}", generate_config_template());
                Ok(())
            } else {
                init_config(*force, path.clone())
            }
        }
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show => show_config(),
    }
}

/// Initialize a new configuration file.
fn init_config(force: bool, custom_path: Option<PathBuf>) -> Result<(), TopscrollError> {
    let config_path = custom_path.unwrap_or_else(|| {
        config_paths().into_iter().next().unwrap_or_else(|| PathBuf::from("config.jsonc"))
    });

    if config_path.exists() && !force {
        return Err(TopscrollError::ConfigError(format!(
            "Configuration file already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        )));
    }

    create_config_file(&config_path).map_err(|e| {
        TopscrollError::ConfigError(format!(
            "Failed to create config file {}: {e}",
            config_path.display()
        ))
    })?;

    println!("Configuration file created at: {}", config_path.display());
    println!("\nAll options are commented out by default.");
    println!("Edit the file and uncomment the options you want to configure.");

    Ok(())
}

/// Show the configuration file search paths.
fn show_config_path() {
    if let Some(path) = config::custom_config_path() {
        println!("Using custom configuration file: {}", path.display());
        return;
    }

    println!("Configuration file search paths (in priority order):\n");

    let mut found_config = false;
    for (i, path) in config_paths().iter().enumerate() {
        let exists = path.exists();
        let marker = if exists && !found_config {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };

        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if !found_config {
        println!("\nNo configuration file found.");
        println!("Run 'topscroll config init' to create one.");
    }
}

/// Print the effective configuration.
fn show_config() -> Result<(), TopscrollError> {
    let config = effective_config()?;
    print_highlighted_json(&serde_json::to_value(&config)?);
    Ok(())
}

/// Loads the configuration without creating a template, clamping out-of-range values.
///
/// A missing file yields the defaults; a broken file is an error.
///
/// # Errors
///
/// Returns an error if the configuration file exists but cannot be loaded.
pub fn effective_config() -> Result<TopscrollConfig, TopscrollError> {
    let mut config = match config::load_config() {
        Ok((config, _)) => config,
        Err(ConfigError::NotFound) => TopscrollConfig::default(),
        Err(err) => return Err(err.into()),
    };
    config.scroll = config.scroll.validated();
    Ok(config)
}
