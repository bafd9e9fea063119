//! Core data types for scroll routing.
//!
//! These types are platform independent:
//! - `ScrollEvent` is a decoded scroll input occurrence (read-only to the engine)
//! - `TargetElement` is an accessibility element eligible to receive scroll
//! - `RoutingVerdict` is the output of the decision engine

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry Types
// ============================================================================

/// A point in global screen coordinates (top-left origin, as used by Quartz events).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    /// Returns the point snapped to whole pixels.
    ///
    /// Used as the key of the lookup cache, so sub-pixel trackpad jitter does
    /// not defeat caching.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pixel(&self) -> (i64, i64) { (self.x.round() as i64, self.y.round() as i64) }
}

/// A rectangle with position and size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if this rectangle has valid dimensions.
    #[must_use]
    pub fn is_valid(&self) -> bool { self.width > 0.0 && self.height > 0.0 }

    /// Check if this rectangle contains a point.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Get the center point of this rectangle.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Right edge (exclusive).
    #[must_use]
    pub fn max_x(&self) -> f64 { self.x + self.width }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn max_y(&self) -> f64 { self.y + self.height }

    /// Returns `point` moved to the nearest position inside the rectangle,
    /// at least `margin` away from every edge when the rectangle is big enough.
    #[must_use]
    pub fn clamp_point(&self, point: Point, margin: f64) -> Point {
        let margin_x = margin.min(self.width / 2.0);
        let margin_y = margin.min(self.height / 2.0);
        Point::new(
            point.x.clamp(self.x + margin_x, self.max_x() - margin_x),
            point.y.clamp(self.y + margin_y, self.max_y() - margin_y),
        )
    }
}

// ============================================================================
// Scroll Event
// ============================================================================

/// Class of the physical device that produced a scroll event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Line-based scroll wheel (discrete notches).
    Wheel,
    /// Continuous, pixel-precise devices such as trackpads and touch mice.
    Trackpad,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wheel => write!(f, "wheel"),
            Self::Trackpad => write!(f, "trackpad"),
        }
    }
}

/// Phase of a scroll event within a gesture.
///
/// Discrete wheel events carry `None`. Trackpad gestures go through
/// `MayBegin`/`Began`, `Changed`, `Ended`, optionally followed by momentum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollPhase {
    #[default]
    None,
    MayBegin,
    Began,
    Changed,
    Ended,
    Cancelled,
    MomentumBegan,
    Momentum,
    MomentumEnded,
}

impl ScrollPhase {
    /// Returns whether this phase starts a new gesture.
    #[must_use]
    pub const fn starts_gesture(self) -> bool { matches!(self, Self::MayBegin | Self::Began) }

    /// Returns whether this phase continues a gesture started earlier.
    #[must_use]
    pub const fn continues_gesture(self) -> bool {
        matches!(
            self,
            Self::Changed
                | Self::Ended
                | Self::Cancelled
                | Self::MomentumBegan
                | Self::Momentum
                | Self::MomentumEnded
        )
    }

    /// Returns whether this is an inertial (momentum) phase.
    #[must_use]
    pub const fn is_momentum(self) -> bool {
        matches!(self, Self::MomentumBegan | Self::Momentum | Self::MomentumEnded)
    }

    /// Returns whether this phase terminates the gesture memory.
    #[must_use]
    pub const fn ends_gesture(self) -> bool { matches!(self, Self::Cancelled | Self::MomentumEnded) }
}

/// Identity value stamped on events produced by this process.
///
/// On macOS this is written into the event's source user-data field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceTag(pub i64);

/// Where a scroll event came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOrigin {
    /// Raw event delivered by the input system.
    #[default]
    Hardware,
    /// Event re-injected by this process, stamped with our source tag.
    Synthetic(SourceTag),
}

/// Pixel deltas a line-based wheel event carries next to its line deltas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelDelta {
    pub x: f64,
    pub y: f64,
}

/// One scroll input occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrollEvent {
    /// Pointer position in global screen coordinates.
    pub position: Point,
    /// Horizontal delta: points for continuous devices, fractional lines for wheels.
    pub delta_x: f64,
    /// Vertical delta: points for continuous devices, fractional lines for wheels.
    pub delta_y: f64,
    /// Pixel deltas of a wheel event, when the input system reported them.
    #[serde(default)]
    pub pixel_delta: Option<PixelDelta>,
    /// Gesture phase.
    pub phase: ScrollPhase,
    /// Device class that produced the event.
    pub device: DeviceClass,
    /// Event timestamp in nanoseconds (monotonic, as delivered by the OS).
    pub timestamp_ns: u64,
    /// Origin tag used for loop prevention.
    pub origin: EventOrigin,
}

impl ScrollEvent {
    /// Creates a hardware-origin event with no phase.
    #[must_use]
    pub const fn new(position: Point, delta_x: f64, delta_y: f64, device: DeviceClass) -> Self {
        Self {
            position,
            delta_x,
            delta_y,
            pixel_delta: None,
            phase: ScrollPhase::None,
            device,
            timestamp_ns: 0,
            origin: EventOrigin::Hardware,
        }
    }

    /// Returns a copy with the given phase.
    #[must_use]
    pub const fn with_phase(mut self, phase: ScrollPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Returns a copy with the given timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Returns a copy carrying the given wheel pixel deltas.
    #[must_use]
    pub const fn with_pixel_delta(mut self, x: f64, y: f64) -> Self {
        self.pixel_delta = Some(PixelDelta { x, y });
        self
    }

    /// Returns a copy with the given origin.
    #[must_use]
    pub const fn with_origin(mut self, origin: EventOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Returns whether this event was produced by this process.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool { matches!(self.origin, EventOrigin::Synthetic(_)) }
}

// ============================================================================
// Target Element & Verdict
// ============================================================================

/// Capabilities reported by the accessibility layer for one element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementCapabilities {
    /// Whether the element scrolls its content.
    pub scrollable: bool,
    /// Screen frame of the element, if the element reports one.
    pub frame: Option<Rect>,
    /// Accessibility role, for diagnostics.
    pub role: Option<String>,
}

/// An element eligible to receive rerouted scroll input.
///
/// Only constructed through [`TargetElement::from_capabilities`], which
/// rejects non-scrollable elements, so every value has `scrollable == true`.
///
/// The delivery point is where a rerouted event is posted so that OS hit
/// testing lands on this element. It starts at the frame center; the decision
/// engine replaces it with a verified point.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetElement<E> {
    handle: E,
    frame: Rect,
    role: Option<String>,
    delivery: Point,
}

impl<E> TargetElement<E> {
    /// Builds a target from a handle and its capabilities.
    ///
    /// Returns `None` when the element is not scrollable or has no usable frame.
    #[must_use]
    pub fn from_capabilities(handle: E, capabilities: ElementCapabilities) -> Option<Self> {
        if !capabilities.scrollable {
            return None;
        }
        let frame = capabilities.frame.filter(Rect::is_valid)?;
        Some(Self { handle, frame, role: capabilities.role, delivery: frame.center() })
    }

    /// Returns the target with `point` as its delivery point.
    #[must_use]
    pub fn with_delivery_point(self, point: Point) -> Self { Self { delivery: point, ..self } }

    /// The accessibility handle.
    #[must_use]
    pub const fn handle(&self) -> &E { &self.handle }

    /// The element's screen frame.
    #[must_use]
    pub const fn frame(&self) -> Rect { self.frame }

    /// The element's accessibility role, if known.
    #[must_use]
    pub fn role(&self) -> Option<&str> { self.role.as_deref() }

    /// Where a rerouted event is posted.
    #[must_use]
    pub const fn delivery_point(&self) -> Point { self.delivery }

    /// Always `true`; present so callers can state the invariant explicitly.
    #[must_use]
    pub const fn is_scrollable(&self) -> bool { true }
}

/// Decision engine output for one event.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutingVerdict<E> {
    /// Deliver the event unmodified to its default recipient.
    PassThrough,
    /// Redirect the event to the given scrollable element.
    Reroute(TargetElement<E>),
    /// Drop the event entirely.
    Suppress,
}

impl<E> RoutingVerdict<E> {
    /// Returns whether this is a pass-through verdict.
    #[must_use]
    pub const fn is_pass_through(&self) -> bool { matches!(self, Self::PassThrough) }

    /// Returns the reroute target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&TargetElement<E>> {
        match self {
            Self::Reroute(target) => Some(target),
            _ => None,
        }
    }

    /// Short label for logs and CLI output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PassThrough => "pass-through",
            Self::Reroute(_) => "reroute",
            Self::Suppress => "suppress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_is_half_open() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(99.9, 49.9)));
        assert!(!rect.contains(Point::new(100.0, 10.0)));
        assert!(!rect.contains(Point::new(10.0, 50.0)));
    }

    #[test]
    fn test_rect_clamp_point_keeps_margin() {
        let rect = Rect::new(100.0, 100.0, 50.0, 20.0);
        assert_eq!(rect.clamp_point(Point::new(0.0, 110.0), 2.0), Point::new(102.0, 110.0));
        assert_eq!(rect.clamp_point(Point::new(500.0, 500.0), 2.0), Point::new(148.0, 118.0));
        assert_eq!(rect.clamp_point(Point::new(120.0, 105.0), 2.0), Point::new(120.0, 105.0));
        // Margins never exceed half the size.
        let thin = Rect::new(0.0, 0.0, 2.0, 2.0);
        assert_eq!(thin.clamp_point(Point::new(9.0, 9.0), 5.0), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_point_pixel_rounds() {
        assert_eq!(Point::new(10.4, 20.6).pixel(), (10, 21));
    }

    #[test]
    fn test_target_requires_scrollable() {
        let caps = ElementCapabilities {
            scrollable: false,
            frame: Some(Rect::new(0.0, 0.0, 10.0, 10.0)),
            role: None,
        };
        assert!(TargetElement::from_capabilities(1u32, caps).is_none());
    }

    #[test]
    fn test_target_requires_valid_frame() {
        let caps = ElementCapabilities {
            scrollable: true,
            frame: Some(Rect::new(0.0, 0.0, 0.0, 10.0)),
            role: None,
        };
        assert!(TargetElement::from_capabilities(1u32, caps).is_none());

        let no_frame = ElementCapabilities { scrollable: true, frame: None, role: None };
        assert!(TargetElement::from_capabilities(1u32, no_frame).is_none());
    }

    #[test]
    fn test_target_from_scrollable_element() {
        let caps = ElementCapabilities {
            scrollable: true,
            frame: Some(Rect::new(5.0, 5.0, 10.0, 10.0)),
            role: Some("AXScrollArea".to_string()),
        };
        let target = TargetElement::from_capabilities(7u32, caps).unwrap();
        assert_eq!(*target.handle(), 7);
        assert!(target.is_scrollable());
        assert_eq!(target.role(), Some("AXScrollArea"));
        assert_eq!(target.delivery_point(), Point::new(10.0, 10.0));

        let moved = target.with_delivery_point(Point::new(6.0, 6.0));
        assert_eq!(moved.delivery_point(), Point::new(6.0, 6.0));
        assert_eq!(*moved.handle(), 7);
    }

    #[test]
    fn test_phase_classification() {
        assert!(ScrollPhase::Began.starts_gesture());
        assert!(!ScrollPhase::None.starts_gesture());
        assert!(!ScrollPhase::None.continues_gesture());
        assert!(ScrollPhase::Momentum.is_momentum());
        assert!(ScrollPhase::Momentum.continues_gesture());
        assert!(ScrollPhase::MomentumEnded.ends_gesture());
        assert!(!ScrollPhase::Ended.ends_gesture());
    }

    #[test]
    fn test_synthetic_origin() {
        let event = ScrollEvent::new(Point::new(1.0, 1.0), 0.0, -3.0, DeviceClass::Wheel);
        assert!(!event.is_synthetic());
        let tagged = event.with_origin(EventOrigin::Synthetic(SourceTag(42)));
        assert!(tagged.is_synthetic());
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(RoutingVerdict::<u32>::PassThrough.label(), "pass-through");
        assert_eq!(RoutingVerdict::<u32>::Suppress.label(), "suppress");
        assert!(RoutingVerdict::<u32>::PassThrough.is_pass_through());
    }
}
