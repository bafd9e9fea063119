//! Reroute executor: re-issues a scroll event so it lands on a chosen element.
//!
//! The OS delivers scroll input to whatever sits under the event's location,
//! so rerouting is a matter of posting a copy of the event at the target's
//! delivery point, a position the decision engine verified hit-tests into the
//! target. The copy carries our source tag, which is how the decision engine
//! recognizes it on its way back through the tap.

use crate::error::TopscrollError;
use crate::routing::accessor::{AccessibilityTree, EventInjector};
use crate::routing::binder::ResourceBinder;
use crate::routing::types::{EventOrigin, ScrollEvent, SourceTag, TargetElement};

/// Builds the synthetic copy of `event` addressed to `target`.
///
/// Delta, phase, device and timestamp are preserved untouched.
#[must_use]
pub fn retarget<E>(event: &ScrollEvent, target: &TargetElement<E>, tag: SourceTag) -> ScrollEvent {
    ScrollEvent {
        position: target.delivery_point(),
        origin: EventOrigin::Synthetic(tag),
        ..*event
    }
}

/// Applies `Reroute` verdicts by posting synthetic events.
pub struct RerouteExecutor<'a, T: AccessibilityTree, I: EventInjector> {
    binder: &'a ResourceBinder<'a, T, I>,
}

impl<'a, T: AccessibilityTree, I: EventInjector> RerouteExecutor<'a, T, I> {
    #[must_use]
    pub const fn new(binder: &'a ResourceBinder<'a, T, I>) -> Self { Self { binder } }

    /// Re-injects `event` so that it is delivered to `target`.
    ///
    /// Returns the synthetic event that was posted.
    ///
    /// # Errors
    ///
    /// Returns [`TopscrollError::InjectionFailed`] if the event source cannot
    /// be acquired or the OS rejects the event. The caller must then let the
    /// original event through.
    pub fn reroute(
        &self,
        event: &ScrollEvent,
        target: &TargetElement<T::Element>,
    ) -> Result<ScrollEvent, TopscrollError> {
        let injector = self.binder.injector();
        let source = self.binder.acquire_event_source().map_err(|err| match err {
            TopscrollError::InjectionFailed(_) => err,
            other => TopscrollError::InjectionFailed(other.to_string()),
        })?;

        let synthetic = retarget(event, target, injector.source_tag(source));
        injector.post(source, &synthetic)?;

        tracing::trace!(
            from_x = event.position.x,
            from_y = event.position.y,
            to_x = synthetic.position.x,
            to_y = synthetic.position.y,
            role = target.role().unwrap_or("unknown"),
            "rerouted scroll event"
        );
        Ok(synthetic)
    }
}
