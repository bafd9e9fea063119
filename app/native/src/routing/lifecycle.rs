//! Lifecycle manager: owns the epoch state and is the single entry point for
//! the event tap.
//!
//! # Architecture
//!
//! ```text
//! control thread                       tap thread
//! ──────────────                       ──────────
//! NotificationSource ─► reset() ─┐     handle_event()
//!                                │       ├─ StateCell::snapshot()
//!                      StateCell ◄───────┤
//!                                        ├─ DecisionEngine::decide()
//!                                        └─ RerouteExecutor::reroute()
//! ```
//!
//! `reset()` publishes a fresh [`GlobalState`](crate::routing::state::GlobalState)
//! snapshot. An in-flight decision keeps the `Arc` it started with, so it
//! finishes against either the old or the new epoch, never a mixture.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;

use crate::config::ScrollConfig;
use crate::error::TopscrollError;
use crate::routing::accessor::{AccessibilityTree, EventInjector};
use crate::routing::binder::{PlatformState, ResourceBinder};
use crate::routing::engine::{Decision, DecisionEngine, DecisionOutcome};
use crate::routing::executor::RerouteExecutor;
use crate::routing::probe::ProbeReport;
use crate::routing::state::{PermissionState, StateCell};
use crate::routing::stats::{DecisionStats, StatsSnapshot};
use crate::routing::types::{Point, RoutingVerdict, ScrollEvent};

// ============================================================================
// Reset Reasons & Notification Sources
// ============================================================================

/// Why the epoch was advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetReason {
    DisplayReconfigured,
    SystemWillSleep,
    SystemDidWake,
    SessionSwitched,
    FrontmostAppChanged,
    PermissionChanged,
    ConfigReloaded,
    /// The OS disabled the tap and it was re-enabled.
    TapReenabled,
    /// An accessibility query reported the root handle as invalid.
    StaleHandle,
    Manual,
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DisplayReconfigured => "display-reconfigured",
            Self::SystemWillSleep => "system-will-sleep",
            Self::SystemDidWake => "system-did-wake",
            Self::SessionSwitched => "session-switched",
            Self::FrontmostAppChanged => "frontmost-app-changed",
            Self::PermissionChanged => "permission-changed",
            Self::ConfigReloaded => "config-reloaded",
            Self::TapReenabled => "tap-reenabled",
            Self::StaleHandle => "stale-handle",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Callback handed to notification sources.
pub type ResetHook = Arc<dyn Fn(ResetReason) + Send + Sync>;

/// A system notification feed that can trigger resets.
pub trait NotificationSource {
    /// Human readable name for logs.
    fn name(&self) -> &'static str;

    /// Starts delivering notifications to `on_reset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the registration.
    fn subscribe(&self, on_reset: ResetHook) -> Result<(), TopscrollError>;
}

// ============================================================================
// Tap Outcome & Status
// ============================================================================

/// What the event tap should do with the original event.
#[derive(Clone, Debug, PartialEq)]
pub enum TapOutcome {
    /// Deliver the original event unchanged.
    PassThrough,
    /// A synthetic copy was posted; drop the original.
    Rerouted(ScrollEvent),
    /// Drop the original.
    Suppressed,
}

impl TapOutcome {
    /// Returns whether the tap must swallow the original event.
    #[must_use]
    pub const fn consumes_original(&self) -> bool { !matches!(self, Self::PassThrough) }
}

/// Serializable controller state for the `status` command.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub epoch: u64,
    pub enabled: bool,
    pub permission: PermissionState,
    pub handles_acquired: bool,
    pub stats: StatsSnapshot,
}

// ============================================================================
// Scroll Controller
// ============================================================================

/// Owner of the routing state for one pair of platform accessors.
pub struct ScrollController<T: AccessibilityTree, I: EventInjector> {
    tree: T,
    injector: I,
    state: StateCell<T::Root, I::Source, T::Element>,
    engine: DecisionEngine<T::Element>,
    config: RwLock<Arc<ScrollConfig>>,
    stats: DecisionStats,
    initialized: AtomicBool,
}

impl<T, I> ScrollController<T, I>
where
    T: AccessibilityTree,
    I: EventInjector,
{
    /// Creates a controller. No native handle is created until the first event.
    #[must_use]
    pub fn new(tree: T, injector: I, config: ScrollConfig) -> Self {
        Self {
            tree,
            injector,
            state: StateCell::new(),
            engine: DecisionEngine::new(),
            config: RwLock::new(Arc::new(config.validated())),
            stats: DecisionStats::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Registers for system notifications that invalidate cached state.
    ///
    /// Only the first call subscribes; later calls return `false`. A source
    /// that fails to register is logged and skipped: the remaining sources
    /// still keep the state fresh.
    pub fn initialize(self: &Arc<Self>, sources: &[&dyn NotificationSource]) -> bool
    where
        T: 'static,
        I: 'static,
    {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return false;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let hook: ResetHook = Arc::new(move |reason| {
            if let Some(controller) = weak.upgrade() {
                controller.reset(reason);
            }
        });

        for source in sources {
            match source.subscribe(Arc::clone(&hook)) {
                Ok(()) => tracing::debug!(source = source.name(), "subscribed to notifications"),
                Err(err) => {
                    tracing::warn!(source = source.name(), error = %err, "notification source unavailable");
                }
            }
        }
        true
    }

    /// Returns whether [`initialize`](Self::initialize) has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool { self.initialized.load(Ordering::Acquire) }

    /// Invalidates all cached handles and lookups by publishing a new epoch.
    ///
    /// Safe to call from any thread at any time. Never panics; if releasing
    /// the old handles fails the error is logged and the new epoch still
    /// stands. Returns the current epoch after the call.
    pub fn reset(&self, reason: ResetReason) -> u64 {
        let published = catch_unwind(AssertUnwindSafe(|| self.state.publish_fresh()));
        let epoch = match published {
            Ok(epoch) => epoch,
            Err(_) => {
                tracing::error!(%reason, "releasing handles panicked during reset");
                self.state.epoch()
            }
        };

        self.stats.record_reset();
        tracing::debug!(%reason, epoch, stats = ?self.stats.snapshot(), "routing state reset");
        epoch
    }

    /// Decides how `event` should be routed without acting on it.
    pub fn decide(&self, event: &ScrollEvent) -> RoutingVerdict<T::Element> {
        self.decide_detailed(event).verdict
    }

    /// Like [`decide`](Self::decide), also reporting how the verdict was reached.
    pub fn decide_detailed(&self, event: &ScrollEvent) -> Decision<T::Element> {
        let config = self.config();
        let snapshot = self.state.snapshot();
        let mut decision = self.decide_in(&snapshot, event, &config);

        if decision.outcome == DecisionOutcome::StaleRoot {
            // Another thread may already have published a fresh epoch.
            if self.state.is_current(&snapshot) {
                self.reset(ResetReason::StaleHandle);
            }
            self.stats.record_stale_recovery();
            let fresh = self.state.snapshot();
            decision = self.decide_in(&fresh, event, &config);
        }

        self.stats.record(&decision);
        decision
    }

    /// Full tap path: decide, then reroute if needed.
    ///
    /// Any failure along the way, including a panic, resolves to
    /// [`TapOutcome::PassThrough`] so user input is never lost.
    pub fn handle_event(&self, event: &ScrollEvent) -> TapOutcome {
        catch_unwind(AssertUnwindSafe(|| self.handle_event_inner(event))).unwrap_or_else(|_| {
            tracing::error!("scroll handling panicked; passing event through");
            TapOutcome::PassThrough
        })
    }

    fn handle_event_inner(&self, event: &ScrollEvent) -> TapOutcome {
        let target = match self.decide_detailed(event).verdict {
            RoutingVerdict::PassThrough => return TapOutcome::PassThrough,
            RoutingVerdict::Suppress => return TapOutcome::Suppressed,
            RoutingVerdict::Reroute(target) => target,
        };

        // The event source is always taken from the current epoch.
        let snapshot = self.state.snapshot();
        let binder = ResourceBinder::new(&self.tree, &self.injector, &snapshot);
        match RerouteExecutor::new(&binder).reroute(event, &target) {
            Ok(synthetic) => TapOutcome::Rerouted(synthetic),
            Err(err) => {
                self.stats.record_injection_failure();
                tracing::warn!(error = %err, "reroute failed; delivering original event");
                TapOutcome::PassThrough
            }
        }
    }

    /// Diagnoses what would happen to a scroll at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`TopscrollError::PermissionDenied`] if accessibility is not
    /// granted, or the platform error if the root cannot be created.
    pub fn probe(&self, position: Point) -> Result<ProbeReport, TopscrollError> {
        let config = self.config();
        let snapshot = self.state.snapshot();
        let binder = ResourceBinder::new(&self.tree, &self.injector, &snapshot);
        ProbeReport::collect(&binder, position, config.hop_limit)
    }

    /// Current preferences.
    #[must_use]
    pub fn config(&self) -> Arc<ScrollConfig> { Arc::clone(&self.config.read()) }

    /// Replaces the preferences and starts a new epoch.
    pub fn set_config(&self, config: ScrollConfig) {
        *self.config.write() = Arc::new(config.validated());
        self.reset(ResetReason::ConfigReloaded);
    }

    /// Current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 { self.state.epoch() }

    /// Permission state observed in the current epoch.
    #[must_use]
    pub fn permission(&self) -> PermissionState { self.state.snapshot().permission() }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot { self.stats.snapshot() }

    /// Returns a serializable summary of the controller.
    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        let snapshot = self.state.snapshot();
        ControllerStatus {
            epoch: snapshot.epoch(),
            enabled: self.config().enabled,
            permission: snapshot.permission(),
            handles_acquired: snapshot.has_handles(),
            stats: self.stats.snapshot(),
        }
    }

    /// Returns whether the current epoch holds any native handle.
    #[must_use]
    pub fn has_handles(&self) -> bool { self.state.snapshot().has_handles() }

    /// Returns whether the current epoch holds a cached lookup.
    #[must_use]
    pub fn has_cached_lookup(&self) -> bool { self.state.snapshot().has_cached_lookup() }

    pub const fn tree(&self) -> &T { &self.tree }

    pub const fn injector(&self) -> &I { &self.injector }

    fn decide_in(
        &self,
        snapshot: &PlatformState<T, I>,
        event: &ScrollEvent,
        config: &ScrollConfig,
    ) -> Decision<T::Element> {
        let binder = ResourceBinder::new(&self.tree, &self.injector, snapshot);
        self.engine.decide(event, config, &binder)
    }
}
