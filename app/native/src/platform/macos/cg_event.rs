//! Quartz scroll-wheel event fields.
//!
//! Converts between raw `CGEventRef` scroll events and [`ScrollEvent`]. Field
//! numbers are the `CGEventField` values from `CGEventTypes.h`.

use std::ffi::c_void;
use std::ptr;

use core_graphics::geometry::CGPoint;

use crate::constants::SYNTHETIC_EVENT_MARKER;
use crate::routing::{DeviceClass, EventOrigin, Point, ScrollEvent, ScrollPhase, SourceTag};

// ============================================================================
// FFI Declarations
// ============================================================================

pub type CGEventRef = *mut c_void;
pub type CGEventSourceRef = *mut c_void;

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventCreate(source: CGEventSourceRef) -> CGEventRef;
    fn CGEventGetLocation(event: CGEventRef) -> CGPoint;
    fn CGEventSetLocation(event: CGEventRef, location: CGPoint);
    fn CGEventGetTimestamp(event: CGEventRef) -> u64;
    fn CGEventSetTimestamp(event: CGEventRef, timestamp: u64);
    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    fn CGEventSetIntegerValueField(event: CGEventRef, field: u32, value: i64);
    fn CGEventGetDoubleValueField(event: CGEventRef, field: u32) -> f64;
    fn CGEventSetDoubleValueField(event: CGEventRef, field: u32, value: f64);
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFRelease(cf: *const c_void);
}

// Event types
pub const K_CG_EVENT_SCROLL_WHEEL: u32 = 22;
pub const K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
pub const K_CG_EVENT_TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;

// Event fields
pub const K_CG_SCROLL_WHEEL_EVENT_DELTA_AXIS_1: u32 = 11;
pub const K_CG_SCROLL_WHEEL_EVENT_DELTA_AXIS_2: u32 = 12;
pub const K_CG_EVENT_SOURCE_USER_DATA: u32 = 42;
pub const K_CG_SCROLL_WHEEL_EVENT_IS_CONTINUOUS: u32 = 88;
pub const K_CG_SCROLL_WHEEL_EVENT_FIXED_PT_DELTA_AXIS_1: u32 = 93;
pub const K_CG_SCROLL_WHEEL_EVENT_FIXED_PT_DELTA_AXIS_2: u32 = 94;
pub const K_CG_SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_1: u32 = 96;
pub const K_CG_SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_2: u32 = 97;
pub const K_CG_SCROLL_WHEEL_EVENT_SCROLL_PHASE: u32 = 99;
pub const K_CG_SCROLL_WHEEL_EVENT_MOMENTUM_PHASE: u32 = 123;

// kCGScrollPhase* bit values
const SCROLL_PHASE_BEGAN: i64 = 1;
const SCROLL_PHASE_CHANGED: i64 = 2;
const SCROLL_PHASE_ENDED: i64 = 4;
const SCROLL_PHASE_CANCELLED: i64 = 8;
const SCROLL_PHASE_MAY_BEGIN: i64 = 128;

// kCGMomentumScrollPhase* values
const MOMENTUM_PHASE_NONE: i64 = 0;
const MOMENTUM_PHASE_BEGIN: i64 = 1;
const MOMENTUM_PHASE_CONTINUE: i64 = 2;
const MOMENTUM_PHASE_END: i64 = 3;

// ============================================================================
// Phase Mapping
// ============================================================================

/// Maps the Quartz scroll and momentum phase fields to a [`ScrollPhase`].
///
/// The momentum field wins when both are set.
#[must_use]
pub const fn phase_from_fields(scroll_phase: i64, momentum_phase: i64) -> ScrollPhase {
    match momentum_phase {
        MOMENTUM_PHASE_BEGIN => return ScrollPhase::MomentumBegan,
        MOMENTUM_PHASE_CONTINUE => return ScrollPhase::Momentum,
        MOMENTUM_PHASE_END => return ScrollPhase::MomentumEnded,
        _ => {}
    }
    match scroll_phase {
        SCROLL_PHASE_BEGAN => ScrollPhase::Began,
        SCROLL_PHASE_CHANGED => ScrollPhase::Changed,
        SCROLL_PHASE_ENDED => ScrollPhase::Ended,
        SCROLL_PHASE_CANCELLED => ScrollPhase::Cancelled,
        SCROLL_PHASE_MAY_BEGIN => ScrollPhase::MayBegin,
        _ => ScrollPhase::None,
    }
}

/// Inverse of [`phase_from_fields`]: `(scroll_phase, momentum_phase)`.
#[must_use]
pub const fn phase_fields(phase: ScrollPhase) -> (i64, i64) {
    match phase {
        ScrollPhase::None => (0, MOMENTUM_PHASE_NONE),
        ScrollPhase::MayBegin => (SCROLL_PHASE_MAY_BEGIN, MOMENTUM_PHASE_NONE),
        ScrollPhase::Began => (SCROLL_PHASE_BEGAN, MOMENTUM_PHASE_NONE),
        ScrollPhase::Changed => (SCROLL_PHASE_CHANGED, MOMENTUM_PHASE_NONE),
        ScrollPhase::Ended => (SCROLL_PHASE_ENDED, MOMENTUM_PHASE_NONE),
        ScrollPhase::Cancelled => (SCROLL_PHASE_CANCELLED, MOMENTUM_PHASE_NONE),
        ScrollPhase::MomentumBegan => (0, MOMENTUM_PHASE_BEGIN),
        ScrollPhase::Momentum => (0, MOMENTUM_PHASE_CONTINUE),
        ScrollPhase::MomentumEnded => (0, MOMENTUM_PHASE_END),
    }
}

/// Classifies the origin from the source user-data field.
#[must_use]
pub const fn origin_from_user_data(user_data: i64) -> EventOrigin {
    if user_data == SYNTHETIC_EVENT_MARKER {
        EventOrigin::Synthetic(SourceTag(SYNTHETIC_EVENT_MARKER))
    } else {
        EventOrigin::Hardware
    }
}

// ============================================================================
// Motion Fields
// ============================================================================

/// Motion-related fields of a scroll-wheel event. Axis 1 is vertical.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelFields {
    pub continuous: bool,
    /// Integer line deltas (fields 11 and 12).
    pub line: [i64; 2],
    /// Fractional line deltas (fields 93 and 94).
    pub fixed_point: [f64; 2],
    /// Pixel deltas (fields 96 and 97). `None` leaves the event's own values.
    pub point: Option<[f64; 2]>,
    pub scroll_phase: i64,
    pub momentum_phase: i64,
}

impl WheelFields {
    /// Fields that reproduce the motion of `scroll`.
    ///
    /// Continuous devices carry pixel deltas; wheels carry fractional line
    /// deltas plus the pixel deltas they were decoded with, if any.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_event(scroll: &ScrollEvent) -> Self {
        let continuous = scroll.device == DeviceClass::Trackpad;
        let deltas = [scroll.delta_y, scroll.delta_x];
        let point = if continuous {
            Some(deltas)
        } else {
            scroll.pixel_delta.map(|pixels| [pixels.y, pixels.x])
        };
        let (scroll_phase, momentum_phase) = phase_fields(scroll.phase);

        Self {
            continuous,
            line: [deltas[0].round() as i64, deltas[1].round() as i64],
            fixed_point: deltas,
            point,
            scroll_phase,
            momentum_phase,
        }
    }

    /// Builds a hardware-origin event at `position` from these fields.
    #[must_use]
    pub fn to_event(&self, position: Point) -> ScrollEvent {
        let phase = phase_from_fields(self.scroll_phase, self.momentum_phase);
        if self.continuous {
            let [dy, dx] = self.point.unwrap_or(self.fixed_point);
            return ScrollEvent::new(position, dx, dy, DeviceClass::Trackpad).with_phase(phase);
        }

        let [dy, dx] = self.fixed_point;
        let event = ScrollEvent::new(position, dx, dy, DeviceClass::Wheel).with_phase(phase);
        match self.point {
            Some([pixel_y, pixel_x]) => event.with_pixel_delta(pixel_x, pixel_y),
            None => event,
        }
    }
}

// ============================================================================
// Event Conversion
// ============================================================================

/// Decodes a scroll-wheel `CGEvent`.
///
/// # Safety
///
/// `event` must be a valid, non-null scroll-wheel `CGEventRef`.
#[must_use]
pub unsafe fn decode_scroll_event(event: CGEventRef) -> ScrollEvent {
    unsafe {
        let location = CGEventGetLocation(event);
        let fields = WheelFields {
            continuous: CGEventGetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_IS_CONTINUOUS) != 0,
            line: [
                CGEventGetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_DELTA_AXIS_1),
                CGEventGetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_DELTA_AXIS_2),
            ],
            fixed_point: [
                CGEventGetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_FIXED_PT_DELTA_AXIS_1),
                CGEventGetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_FIXED_PT_DELTA_AXIS_2),
            ],
            point: Some([
                CGEventGetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_1),
                CGEventGetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_2),
            ]),
            scroll_phase: CGEventGetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_SCROLL_PHASE),
            momentum_phase: CGEventGetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_MOMENTUM_PHASE),
        };
        let origin =
            origin_from_user_data(CGEventGetIntegerValueField(event, K_CG_EVENT_SOURCE_USER_DATA));

        fields
            .to_event(Point::new(location.x, location.y))
            .with_timestamp(CGEventGetTimestamp(event))
            .with_origin(origin)
    }
}

/// Writes position, deltas, phase, timestamp and tag of `scroll` into `event`.
///
/// Every delta field is overwritten, so values the event was created with
/// (such as rounded line counts) do not survive.
///
/// # Safety
///
/// `event` must be a valid, non-null scroll-wheel `CGEventRef` owned by the caller.
pub unsafe fn encode_scroll_event(event: CGEventRef, scroll: &ScrollEvent, tag: SourceTag) {
    let fields = WheelFields::from_event(scroll);
    unsafe {
        CGEventSetLocation(event, CGPoint::new(scroll.position.x, scroll.position.y));
        CGEventSetIntegerValueField(event, K_CG_EVENT_SOURCE_USER_DATA, tag.0);
        CGEventSetIntegerValueField(
            event,
            K_CG_SCROLL_WHEEL_EVENT_IS_CONTINUOUS,
            i64::from(fields.continuous),
        );

        CGEventSetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_DELTA_AXIS_1, fields.line[0]);
        CGEventSetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_DELTA_AXIS_2, fields.line[1]);
        CGEventSetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_FIXED_PT_DELTA_AXIS_1, fields.fixed_point[0]);
        CGEventSetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_FIXED_PT_DELTA_AXIS_2, fields.fixed_point[1]);
        if let Some([axis_1, axis_2]) = fields.point {
            CGEventSetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_1, axis_1);
            CGEventSetDoubleValueField(event, K_CG_SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_2, axis_2);
        }

        CGEventSetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_SCROLL_PHASE, fields.scroll_phase);
        CGEventSetIntegerValueField(event, K_CG_SCROLL_WHEEL_EVENT_MOMENTUM_PHASE, fields.momentum_phase);

        if scroll.timestamp_ns != 0 {
            CGEventSetTimestamp(event, scroll.timestamp_ns);
        }
    }
}

/// Returns the current pointer position in global coordinates.
#[must_use]
pub fn cursor_position() -> Option<Point> {
    unsafe {
        let event = CGEventCreate(ptr::null_mut());
        if event.is_null() {
            return None;
        }
        let location = CGEventGetLocation(event);
        CFRelease(event.cast());
        Some(Point::new(location.x, location.y))
    }
}
