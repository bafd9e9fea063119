//! Configuration module for Topscroll.
//!
//! This module provides configuration types, loading functionality, and file watching
//! for hot-reloading configuration changes.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod template;
pub mod types;
mod watcher;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use types::{
    ConfigError, MAX_HOP_LIMIT, ScrollConfig, TopscrollConfig, config_paths,
    load_config as load_config_default, load_config_from_path,
};
pub use watcher::{watch_config_file, watch_path};

/// Global configuration instance, loaded once at startup.
static CONFIG: OnceLock<TopscrollConfig> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// This must be called before `init()` or `get_config()` to take effect.
///
/// Returns `true` if the path was set successfully, `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Returns the custom configuration path, if one was given.
pub fn custom_config_path() -> Option<&'static PathBuf> { CUSTOM_CONFIG_PATH.get() }

/// Loads the configuration from the custom path or the default search paths.
///
/// # Errors
///
/// Returns the [`ConfigError`] of the first file that failed to load.
pub fn load_config() -> Result<(TopscrollConfig, PathBuf), ConfigError> {
    CUSTOM_CONFIG_PATH
        .get()
        .map_or_else(load_config_default, |path| load_config_from_path(path))
}

/// Loads the configuration from disk.
///
/// Returns the loaded configuration, or a default configuration if loading fails.
/// If no configuration file exists, creates a template configuration file.
fn load_or_default() -> TopscrollConfig {
    match load_config() {
        Ok((config, path)) => {
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => {
            create_default_config_file();
            TopscrollConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            TopscrollConfig::default()
        }
    }
}

/// Creates a template configuration file at the preferred location.
///
/// This is called when no configuration file is found during startup.
fn create_default_config_file() {
    let target = CUSTOM_CONFIG_PATH.get().cloned().or_else(|| config_paths().into_iter().next());
    let Some(config_path) = target else {
        tracing::debug!("no config path available for creating template");
        return;
    };

    if config_path.exists() {
        return;
    }

    match template::create_config_file(&config_path) {
        Ok(()) => {
            let _ = CONFIG_PATH.set(config_path.clone());
            tracing::info!(path = %config_path.display(), "created default configuration file");
        }
        Err(err) => {
            tracing::debug!(
                error = %err,
                path = %config_path.display(),
                "failed to create default configuration file"
            );
        }
    }
}

/// Initializes and returns the global configuration instance.
///
/// This function is idempotent - calling it multiple times will return
/// the same configuration instance.
pub fn init() -> &'static TopscrollConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the configuration loaded at startup, initializing it if necessary.
///
/// Later edits are delivered through [`watch_config_file`], not here.
pub fn get_config() -> &'static TopscrollConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_types_are_available() {
        let config = TopscrollConfig::default();
        assert!(config.scroll.is_enabled());
        assert_eq!(config.scroll.hop_limit, 8);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let template = template::generate_config_template();
        let stripped = json_comments::StripComments::new(template.as_bytes());
        let parsed: TopscrollConfig = serde_json::from_reader(stripped).unwrap();
        assert_eq!(parsed.scroll, ScrollConfig::default());
    }
}
