//! System notification sources that invalidate routing state.
//!
//! - [`WorkspaceNotifications`] - `NSWorkspace` app activation, sleep, wake and
//!   session changes
//! - [`AccessibilityNotifications`] - the distributed notification posted when
//!   the accessibility permission list changes
//! - [`DisplayNotifications`] - Quartz display reconfiguration
//!
//! Objective-C notifications are delivered on the main run loop, so these
//! sources must be subscribed from the main thread before it enters
//! `CFRunLoopRun`.

use std::ffi::c_void;
use std::ptr;

use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel};
use objc::{class, msg_send, sel, sel_impl};
use parking_lot::RwLock;

use super::objc::{nsstring, nsstring_to_string};
use crate::error::TopscrollError;
use crate::routing::{NotificationSource, ResetHook, ResetReason};

// `NSWorkspace` and `NSDistributedNotificationCenter` are looked up at runtime.
#[link(name = "AppKit", kind = "framework")]
unsafe extern "C" {}

#[link(name = "Foundation", kind = "framework")]
unsafe extern "C" {}

// ============================================================================
// Notification Names
// ============================================================================

const WORKSPACE_NOTIFICATIONS: &[(&str, ResetReason)] = &[
    ("NSWorkspaceDidActivateApplicationNotification", ResetReason::FrontmostAppChanged),
    ("NSWorkspaceWillSleepNotification", ResetReason::SystemWillSleep),
    ("NSWorkspaceDidWakeNotification", ResetReason::SystemDidWake),
    ("NSWorkspaceScreensDidWakeNotification", ResetReason::DisplayReconfigured),
    ("NSWorkspaceSessionDidBecomeActiveNotification", ResetReason::SessionSwitched),
    ("NSWorkspaceSessionDidResignActiveNotification", ResetReason::SessionSwitched),
];

const ACCESSIBILITY_NOTIFICATION: &str = "com.apple.accessibility.api";

/// Maps a notification name to the reset it triggers.
#[must_use]
pub fn reason_for_notification(name: &str) -> Option<ResetReason> {
    if name == ACCESSIBILITY_NOTIFICATION {
        return Some(ResetReason::PermissionChanged);
    }
    WORKSPACE_NOTIFICATIONS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, reason)| *reason)
}

// ============================================================================
// Installed Hooks
// ============================================================================

/// Hook invoked by the Objective-C observer.
static OBSERVER_HOOK: RwLock<Option<ResetHook>> = RwLock::new(None);

/// Hook invoked by the display reconfiguration callback.
static DISPLAY_HOOK: RwLock<Option<ResetHook>> = RwLock::new(None);

fn fire(slot: &RwLock<Option<ResetHook>>, reason: ResetReason) {
    let hook = slot.read().clone();
    if let Some(hook) = hook {
        tracing::debug!(%reason, "system notification");
        hook(reason);
    }
}

// ============================================================================
// Objective-C Observer
// ============================================================================

/// Creates the observer object shared by the workspace and distributed centers.
///
/// Returns null if the class cannot be declared.
///
/// # Safety
///
/// Must be called with the Objective-C runtime available. The returned object
/// is retained for the lifetime of the process.
unsafe fn create_observer() -> *mut Object {
    let class_name = "TopscrollNotificationObserver";

    let observer_class = match Class::get(class_name) {
        Some(class) => class,
        None => {
            let Some(mut decl) = ClassDecl::new(class_name, class!(NSObject)) else {
                return ptr::null_mut();
            };
            unsafe {
                decl.add_method(
                    sel!(handleNotification:),
                    handle_notification as extern "C" fn(&Object, Sel, *mut Object),
                );
            }
            decl.register()
        }
    };

    unsafe {
        let instance: *mut Object = msg_send![observer_class, alloc];
        msg_send![instance, init]
    }
}

extern "C" fn handle_notification(_self: &Object, _cmd: Sel, notification: *mut Object) {
    if notification.is_null() {
        return;
    }

    let name = unsafe {
        let name: *mut Object = msg_send![notification, name];
        nsstring_to_string(name)
    };

    if let Some(reason) = reason_for_notification(&name) {
        fire(&OBSERVER_HOOK, reason);
    }
}

/// Registers `observer` on `center` for each notification name.
unsafe fn add_observer(center: *mut Object, observer: *mut Object, names: &[&str]) {
    for name in names {
        unsafe {
            let name = nsstring(name);
            let _: () = msg_send![
                center,
                addObserver: observer
                selector: sel!(handleNotification:)
                name: name
                object: ptr::null::<Object>()
            ];
        }
    }
}

fn install_observer_hook(on_reset: ResetHook) { *OBSERVER_HOOK.write() = Some(on_reset); }

// ============================================================================
// Workspace Notifications
// ============================================================================

/// `NSWorkspace` notifications: app activation, sleep, wake and session switches.
#[derive(Debug, Default)]
pub struct WorkspaceNotifications;

impl NotificationSource for WorkspaceNotifications {
    fn name(&self) -> &'static str { "workspace" }

    fn subscribe(&self, on_reset: ResetHook) -> Result<(), TopscrollError> {
        install_observer_hook(on_reset);

        unsafe {
            let workspace: *mut Object = msg_send![class!(NSWorkspace), sharedWorkspace];
            if workspace.is_null() {
                return Err(TopscrollError::PlatformError("Failed to get shared workspace".to_string()));
            }

            let center: *mut Object = msg_send![workspace, notificationCenter];
            if center.is_null() {
                return Err(TopscrollError::PlatformError(
                    "Failed to get workspace notification center".to_string(),
                ));
            }

            let observer = create_observer();
            if observer.is_null() {
                return Err(TopscrollError::PlatformError("Failed to create observer".to_string()));
            }

            let names: Vec<&str> = WORKSPACE_NOTIFICATIONS.iter().map(|(name, _)| *name).collect();
            add_observer(center, observer, &names);
        }
        Ok(())
    }
}

// ============================================================================
// Accessibility Permission Notifications
// ============================================================================

/// Distributed notification posted when the accessibility allow-list changes.
#[derive(Debug, Default)]
pub struct AccessibilityNotifications;

impl NotificationSource for AccessibilityNotifications {
    fn name(&self) -> &'static str { "accessibility" }

    fn subscribe(&self, on_reset: ResetHook) -> Result<(), TopscrollError> {
        install_observer_hook(on_reset);

        unsafe {
            let center: *mut Object = msg_send![class!(NSDistributedNotificationCenter), defaultCenter];
            if center.is_null() {
                return Err(TopscrollError::PlatformError(
                    "Failed to get distributed notification center".to_string(),
                ));
            }

            let observer = create_observer();
            if observer.is_null() {
                return Err(TopscrollError::PlatformError("Failed to create observer".to_string()));
            }

            add_observer(center, observer, &[ACCESSIBILITY_NOTIFICATION]);
        }
        Ok(())
    }
}

// ============================================================================
// Display Reconfiguration
// ============================================================================

type CGDisplayReconfigurationCallBack =
    extern "C" fn(display: u32, flags: u32, user_info: *mut c_void);

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGDisplayRegisterReconfigurationCallback(
        callback: CGDisplayReconfigurationCallBack,
        user_info: *mut c_void,
    ) -> i32;
}

const K_CG_ERROR_SUCCESS: i32 = 0;
const K_CG_DISPLAY_BEGIN_CONFIGURATION_FLAG: u32 = 1 << 0;

/// Display add, remove, move and mode changes.
#[derive(Debug, Default)]
pub struct DisplayNotifications;

impl NotificationSource for DisplayNotifications {
    fn name(&self) -> &'static str { "display" }

    fn subscribe(&self, on_reset: ResetHook) -> Result<(), TopscrollError> {
        *DISPLAY_HOOK.write() = Some(on_reset);

        let result = unsafe {
            CGDisplayRegisterReconfigurationCallback(display_reconfigured, ptr::null_mut())
        };
        if result != K_CG_ERROR_SUCCESS {
            return Err(TopscrollError::PlatformError(format!(
                "CGDisplayRegisterReconfigurationCallback failed (error {result})"
            )));
        }
        Ok(())
    }
}

extern "C" fn display_reconfigured(_display: u32, flags: u32, _user_info: *mut c_void) {
    // Reset once the change has been applied, not when it is announced.
    if flags & K_CG_DISPLAY_BEGIN_CONFIGURATION_FLAG != 0 {
        return;
    }
    fire(&DISPLAY_HOOK, ResetReason::DisplayReconfigured);
}
