//! Scroll routing engine.
//!
//! Decides, for every scroll event, whether it should go to the element the OS
//! picked or be rerouted to the nearest scrollable element under the pointer.
//!
//! # Architecture
//!
//! - `binder`: lazy, epoch-scoped native handles
//! - `lifecycle`: epoch ownership, resets and the tap entry point
//! - `engine`: the per-event decision state machine
//! - `executor`: re-injection of rerouted events
//!
//! Platform access goes through the traits in `accessor`, so everything in
//! this module runs against in-memory fakes in tests.

pub mod accessor;
pub mod binder;
pub mod engine;
pub mod executor;
pub mod lifecycle;
pub mod probe;
pub mod state;
pub mod stats;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use accessor::{AccessibilityTree, EventInjector};
pub use engine::{Decision, DecisionEngine, DecisionOutcome, DecisionStage, Ineligible};
pub use lifecycle::{
    ControllerStatus, NotificationSource, ResetHook, ResetReason, ScrollController, TapOutcome,
};
pub use probe::ProbeReport;
pub use state::PermissionState;
pub use stats::StatsSnapshot;
pub use types::{
    DeviceClass, ElementCapabilities, EventOrigin, PixelDelta, Point, Rect, RoutingVerdict,
    ScrollEvent, ScrollPhase, SourceTag, TargetElement,
};
