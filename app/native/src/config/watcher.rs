//! Configuration file watcher for hot-reloading.
//!
//! Watches the loaded configuration file and hands every successfully parsed
//! revision to a callback. Files that fail to parse are reported and ignored,
//! so a half-saved edit never replaces a working configuration.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::{TopscrollConfig, get_config_path, load_config_from_path};
use crate::platform::thread::spawn_named_thread;

/// Debounce duration for config file changes.
/// Some editors trigger multiple events per save (write to temp, rename, etc.).
const CONFIG_DEBOUNCE_MS: u64 = 200;

/// Starts watching the loaded configuration file for changes.
///
/// Returns `false` if no configuration file was loaded.
pub fn watch_config_file<F>(on_reload: F) -> bool
where F: Fn(TopscrollConfig) + Send + 'static {
    let Some(config_path) = get_config_path().cloned() else {
        return false;
    };
    watch_path(config_path, on_reload)
}

/// Watches `config_path` on a background thread.
///
/// Returns `false` if the watcher thread could not be started.
pub fn watch_path<F>(config_path: PathBuf, on_reload: F) -> bool
where F: Fn(TopscrollConfig) + Send + 'static {
    spawn_named_thread("config-watcher", move || run_watcher(&config_path, &on_reload))
}

fn run_watcher(config_path: &Path, on_reload: &dyn Fn(TopscrollConfig)) {
    let config_filename =
        config_path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(tx) {
        Ok(w) => w,
        Err(err) => {
            tracing::warn!(error = %err, "failed to create config watcher");
            return;
        }
    };

    // Watch the parent directory to catch file replacements
    // (some editors save by writing to a temp file then renaming)
    let watch_path = config_path.parent().unwrap_or(config_path);
    if let Err(err) = watcher.watch(watch_path, RecursiveMode::NonRecursive) {
        tracing::warn!(error = %err, "failed to watch config file");
        return;
    }

    let debounce_duration = Duration::from_millis(CONFIG_DEBOUNCE_MS);
    let mut last_event_time: Option<Instant> = None;

    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                let affects_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|name| name == config_filename));
                if !affects_config {
                    continue;
                }

                let now = Instant::now();
                if last_event_time.is_some_and(|t| now.duration_since(t) < debounce_duration) {
                    continue;
                }
                match load_config_from_path(config_path) {
                    Ok((config, _)) => {
                        last_event_time = Some(now);
                        tracing::info!(path = %config_path.display(), "configuration reloaded");
                        on_reload(config);
                    }
                    // Partial writes are retried on the next event.
                    Err(err) => {
                        tracing::warn!(error = %err, "ignoring invalid configuration change");
                    }
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "config watch error");
            }
            // Channel closed, watcher dropped
            Err(_) => break,
        }
    }
}
