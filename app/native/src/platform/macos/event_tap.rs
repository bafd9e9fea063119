//! Active session event tap for scroll-wheel events.
//!
//! The tap runs on its own thread with its own run loop. Every scroll event is
//! decoded and handed to the installed [`MacController`]; returning null from
//! the callback drops the original after a synthetic copy has been posted.
//!
//! The OS disables a tap whose callback is too slow. When that happens the tap
//! is re-enabled and the routing state reset, since a slow callback usually
//! means an accessibility handle went bad.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use core_foundation::base::TCFType;
use core_foundation::mach_port::CFMachPort;
use core_foundation::runloop::{CFRunLoop, kCFRunLoopCommonModes};

use super::MacController;
use super::cg_event::{
    CGEventRef, K_CG_EVENT_SCROLL_WHEEL, K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT,
    K_CG_EVENT_TAP_DISABLED_BY_USER_INPUT, decode_scroll_event,
};
use crate::error::TopscrollError;
use crate::platform::thread::spawn_named_thread;
use crate::routing::ResetReason;

// ============================================================================
// FFI Declarations
// ============================================================================

type CGEventTapProxy = *mut c_void;
type CFMachPortRef = *mut c_void;

type CGEventTapCallBack = extern "C" fn(
    proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallBack,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

// Constants for event tap configuration
const K_CG_SESSION_EVENT_TAP: u32 = 1;
const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
const K_CG_EVENT_TAP_OPTION_DEFAULT: u32 = 0;

/// Event mask selecting scroll-wheel events only.
pub const SCROLL_EVENT_MASK: u64 = 1 << K_CG_EVENT_SCROLL_WHEEL;

/// How long [`start`] waits for the tap thread to report back.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Global State
// ============================================================================

/// Whether the tap thread is running.
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Controller receiving tapped events.
static CONTROLLER: OnceLock<Arc<MacController>> = OnceLock::new();

/// The tap's mach port, kept for re-enabling.
static TAP_PORT: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

// ============================================================================
// Public API
// ============================================================================

/// Installs the scroll event tap on a background thread.
///
/// Blocks until the tap is live or has failed to install.
///
/// # Errors
///
/// Returns an error if the tap is already running or cannot be created. The
/// latter almost always means accessibility access has not been granted.
pub fn start(controller: Arc<MacController>) -> Result<(), TopscrollError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TopscrollError::PlatformError("event tap already running".to_string()));
    }
    if CONTROLLER.set(controller).is_err() {
        tracing::debug!("event tap controller already installed");
    }

    let (ready_tx, ready_rx) = mpsc::channel();
    if !spawn_named_thread("event-tap", move || run_tap(&ready_tx)) {
        INITIALIZED.store(false, Ordering::SeqCst);
        return Err(TopscrollError::PlatformError("failed to spawn event tap thread".to_string()));
    }

    let result = ready_rx.recv_timeout(STARTUP_TIMEOUT).unwrap_or_else(|_| {
        Err(TopscrollError::PlatformError("event tap did not start in time".to_string()))
    });
    if result.is_err() {
        INITIALIZED.store(false, Ordering::SeqCst);
    }
    result
}

// ============================================================================
// Event Tap Implementation
// ============================================================================

fn run_tap(ready: &Sender<Result<(), TopscrollError>>) {
    unsafe {
        let tap = CGEventTapCreate(
            K_CG_SESSION_EVENT_TAP,
            K_CG_HEAD_INSERT_EVENT_TAP,
            K_CG_EVENT_TAP_OPTION_DEFAULT,
            SCROLL_EVENT_MASK,
            scroll_tap_callback,
            ptr::null_mut(),
        );

        if tap.is_null() {
            let _ = ready.send(Err(TopscrollError::PlatformError(
                "failed to create event tap; check accessibility permission".to_string(),
            )));
            return;
        }

        // Wrap the tap in a CFMachPort and create a run loop source
        let tap_port = CFMachPort::wrap_under_create_rule(tap.cast());
        let Ok(run_loop_source) = tap_port.create_runloop_source(0) else {
            let _ = ready.send(Err(TopscrollError::PlatformError(
                "failed to create event tap run loop source".to_string(),
            )));
            return;
        };

        CFRunLoop::get_current().add_source(&run_loop_source, kCFRunLoopCommonModes);
        TAP_PORT.store(tap, Ordering::SeqCst);
        CGEventTapEnable(tap, true);

        tracing::info!("scroll event tap installed");
        let _ = ready.send(Ok(()));

        // Run the run loop (this blocks)
        CFRunLoop::run_current();
    }
}

extern "C" fn scroll_tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    _user_info: *mut c_void,
) -> CGEventRef {
    match event_type {
        K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT | K_CG_EVENT_TAP_DISABLED_BY_USER_INPUT => {
            let port = TAP_PORT.load(Ordering::SeqCst);
            if !port.is_null() {
                unsafe { CGEventTapEnable(port, true) };
            }
            tracing::warn!(event_type, "event tap was disabled; re-enabled");
            if let Some(controller) = CONTROLLER.get() {
                controller.reset(ResetReason::TapReenabled);
            }
            event
        }
        K_CG_EVENT_SCROLL_WHEEL if !event.is_null() => {
            let Some(controller) = CONTROLLER.get() else {
                return event;
            };

            let scroll = unsafe { decode_scroll_event(event) };
            if controller.handle_event(&scroll).consumes_original() {
                ptr::null_mut()
            } else {
                event
            }
        }
        _ => event,
    }
}
