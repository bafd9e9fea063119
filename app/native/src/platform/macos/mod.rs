//! macOS integration.
//!
//! - [`ax`] - Accessibility tree (`AXUIElement`)
//! - [`injector`] - Synthetic scroll events (`CGEventSource`)
//! - [`event_tap`] - Active scroll-wheel event tap
//! - [`notifications`] - Workspace, display and permission notifications
//! - [`permissions`] - Accessibility trust checks

pub mod ax;
pub mod cg_event;
pub mod event_tap;
pub mod injector;
pub mod notifications;
pub mod objc;
pub mod permissions;

use std::sync::Arc;

use core_foundation::runloop::CFRunLoop;

pub use ax::{AXElement, MacTree};
pub use injector::{EventSource, MacInjector};
use notifications::{AccessibilityNotifications, DisplayNotifications, WorkspaceNotifications};

use crate::config::{self, ScrollConfig};
use crate::error::TopscrollError;
use crate::routing::{Point, ProbeReport, ScrollController};

/// The controller type used on macOS.
pub type MacController = ScrollController<MacTree, MacInjector>;

fn new_controller(config: ScrollConfig) -> MacController {
    let tree = MacTree::new(config.accessibility_timeout_secs());
    ScrollController::new(tree, MacInjector::new(), config)
}

/// Runs the rerouting daemon on the calling thread, which must be the main thread.
///
/// # Errors
///
/// Returns an error if the event tap cannot be installed.
pub fn run_daemon(config: ScrollConfig) -> Result<(), TopscrollError> {
    if !permissions::check_and_prompt() {
        tracing::warn!("accessibility access not granted; scroll events pass through until it is");
    }

    let controller = Arc::new(new_controller(config));
    controller.initialize(&[
        &WorkspaceNotifications,
        &AccessibilityNotifications,
        &DisplayNotifications,
    ]);

    let weak = Arc::downgrade(&controller);
    let watching = config::watch_config_file(move |reloaded| {
        let Some(controller) = weak.upgrade() else { return };
        let scroll = reloaded.scroll;
        controller.tree().set_messaging_timeout(scroll.accessibility_timeout_secs());
        controller.set_config(scroll);
        tracing::info!("configuration reloaded");
    });
    if !watching {
        tracing::debug!("no configuration file to watch");
    }

    event_tap::start(Arc::clone(&controller))?;
    tracing::info!(epoch = controller.epoch(), "topscroll running");

    CFRunLoop::run_current();

    tracing::info!(stats = ?controller.stats(), "topscroll stopped");
    Ok(())
}

/// Probes the accessibility tree at `position`, or under the pointer.
///
/// # Errors
///
/// Returns an error if the pointer position cannot be read, accessibility is
/// not granted, or the root handle cannot be created.
pub fn probe(position: Option<Point>, config: ScrollConfig) -> Result<ProbeReport, TopscrollError> {
    let position = match position {
        Some(position) => position,
        None => cg_event::cursor_position().ok_or_else(|| {
            TopscrollError::PlatformError("failed to read the pointer position".to_string())
        })?,
    };
    new_controller(config).probe(position)
}
