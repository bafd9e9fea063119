//! Platform integration for Topscroll.
//!
//! - [`thread`] - Named background threads
//! - `macos` - Accessibility tree, event tap, injection and system notifications
//!
//! Everything outside this module is platform independent. On other systems
//! the entry points below report [`TopscrollError::UnsupportedPlatform`], so the
//! CLI still builds and the routing engine can be tested anywhere.

#[cfg(target_os = "macos")]
pub mod macos;
pub mod thread;

use crate::config::ScrollConfig;
use crate::error::TopscrollError;
use crate::routing::{Point, ProbeReport};

/// Returns whether scroll rerouting can run on this system at all.
#[must_use]
pub const fn is_supported() -> bool { cfg!(target_os = "macos") }

/// Returns whether the process currently holds accessibility authorization.
#[must_use]
pub fn is_accessibility_trusted() -> bool {
    #[cfg(target_os = "macos")]
    {
        macos::permissions::is_trusted()
    }
    #[cfg(not(target_os = "macos"))]
    {
        false
    }
}

/// Installs the event tap and runs until the process is terminated.
///
/// # Errors
///
/// Returns an error if the tap cannot be installed.
#[cfg(target_os = "macos")]
pub fn run_daemon(config: ScrollConfig) -> Result<(), TopscrollError> { macos::run_daemon(config) }

/// Installs the event tap and runs until the process is terminated.
///
/// # Errors
///
/// Always returns [`TopscrollError::UnsupportedPlatform`].
#[cfg(not(target_os = "macos"))]
pub fn run_daemon(_config: ScrollConfig) -> Result<(), TopscrollError> {
    Err(TopscrollError::UnsupportedPlatform("run".to_string()))
}

/// Walks the accessibility tree at `position`, or at the pointer if `None`.
///
/// # Errors
///
/// Returns an error if accessibility is not granted or the lookup cannot start.
#[cfg(target_os = "macos")]
pub fn probe(position: Option<Point>, config: ScrollConfig) -> Result<ProbeReport, TopscrollError> {
    macos::probe(position, config)
}

/// Walks the accessibility tree at `position`, or at the pointer if `None`.
///
/// # Errors
///
/// Always returns [`TopscrollError::UnsupportedPlatform`].
#[cfg(not(target_os = "macos"))]
pub fn probe(
    _position: Option<Point>,
    _config: ScrollConfig,
) -> Result<ProbeReport, TopscrollError> {
    Err(TopscrollError::UnsupportedPlatform("probe".to_string()))
}
