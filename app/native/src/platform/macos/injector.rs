//! Posts rerouted scroll events through a private `CGEventSource`.

use std::ffi::c_void;

use super::cg_event::{CGEventRef, CGEventSourceRef, encode_scroll_event};
use crate::constants::SYNTHETIC_EVENT_MARKER;
use crate::error::TopscrollError;
use crate::routing::{DeviceClass, EventInjector, ScrollEvent, SourceTag};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventSourceCreate(state_id: i32) -> CGEventSourceRef;
    fn CGEventSourceSetUserData(source: CGEventSourceRef, user_data: i64);
    fn CGEventCreateScrollWheelEvent(
        source: CGEventSourceRef,
        units: u32,
        wheel_count: u32,
        wheel1: i32,
        ...
    ) -> CGEventRef;
    fn CGEventPost(tap: u32, event: CGEventRef);
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFRelease(cf: *const c_void);
}

const K_CG_EVENT_SOURCE_STATE_HID_SYSTEM_STATE: i32 = 1;
const K_CG_SCROLL_EVENT_UNIT_PIXEL: u32 = 0;
const K_CG_SCROLL_EVENT_UNIT_LINE: u32 = 1;
const K_CG_SESSION_EVENT_TAP: u32 = 1;

/// Owned `CGEventSourceRef`.
pub struct EventSource {
    raw: CGEventSourceRef,
}

impl Drop for EventSource {
    fn drop(&mut self) {
        // SAFETY: raw is non-null and owned.
        unsafe { CFRelease(self.raw.cast()) };
    }
}

// SAFETY: CGEventSource is a CF object that may be used from any thread.
unsafe impl Send for EventSource {}
unsafe impl Sync for EventSource {}

/// Quartz event injector.
#[derive(Debug, Default)]
pub struct MacInjector;

impl MacInjector {
    #[must_use]
    pub const fn new() -> Self { Self }
}

impl EventInjector for MacInjector {
    type Source = EventSource;

    fn create_source(&self) -> Result<EventSource, TopscrollError> {
        let raw = unsafe { CGEventSourceCreate(K_CG_EVENT_SOURCE_STATE_HID_SYSTEM_STATE) };
        if raw.is_null() {
            return Err(TopscrollError::PlatformError("CGEventSourceCreate returned null".to_string()));
        }
        unsafe { CGEventSourceSetUserData(raw, SYNTHETIC_EVENT_MARKER) };
        Ok(EventSource { raw })
    }

    fn source_tag(&self, _source: &EventSource) -> SourceTag { SourceTag(SYNTHETIC_EVENT_MARKER) }

    #[allow(clippy::cast_possible_truncation)]
    fn post(&self, source: &EventSource, event: &ScrollEvent) -> Result<(), TopscrollError> {
        let units = match event.device {
            DeviceClass::Trackpad => K_CG_SCROLL_EVENT_UNIT_PIXEL,
            DeviceClass::Wheel => K_CG_SCROLL_EVENT_UNIT_LINE,
        };

        // The rounded counts only seed the event; encoding writes the exact deltas.
        let raw = unsafe {
            CGEventCreateScrollWheelEvent(
                source.raw,
                units,
                2,
                event.delta_y.round() as i32,
                event.delta_x.round() as i32,
            )
        };
        if raw.is_null() {
            return Err(TopscrollError::InjectionFailed(
                "CGEventCreateScrollWheelEvent returned null".to_string(),
            ));
        }

        unsafe {
            encode_scroll_event(raw, event, self.source_tag(source));
            CGEventPost(K_CG_SESSION_EVENT_TAP, raw);
            CFRelease(raw.cast());
        }
        Ok(())
    }
}
