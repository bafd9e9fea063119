//! Resource binder: lazy, epoch-scoped acquisition of native handles.
//!
//! The binder owns nothing. It borrows the platform accessors and one
//! [`GlobalState`] snapshot, and fills that snapshot's handle slots on first
//! use. Because a reset publishes a brand-new snapshot, handles are cleared
//! simply by no longer being reachable from the current epoch.

use crate::error::TopscrollError;
use crate::routing::accessor::{AccessibilityTree, EventInjector};
use crate::routing::state::{GlobalState, PermissionState};

/// The snapshot type used by a given pair of platform accessors.
pub type PlatformState<T, I> = GlobalState<
    <T as AccessibilityTree>::Root,
    <I as EventInjector>::Source,
    <T as AccessibilityTree>::Element,
>;

/// Borrowed view over one epoch's handles.
pub struct ResourceBinder<'a, T: AccessibilityTree, I: EventInjector> {
    tree: &'a T,
    injector: &'a I,
    state: &'a PlatformState<T, I>,
}

impl<'a, T: AccessibilityTree, I: EventInjector> ResourceBinder<'a, T, I> {
    /// Creates a binder over the given snapshot.
    #[must_use]
    pub const fn new(tree: &'a T, injector: &'a I, state: &'a PlatformState<T, I>) -> Self {
        Self { tree, injector, state }
    }

    /// The snapshot this binder fills.
    #[must_use]
    pub const fn state(&self) -> &'a PlatformState<T, I> { self.state }

    /// The accessibility tree queries run against.
    #[must_use]
    pub const fn tree(&self) -> &'a T { self.tree }

    /// The injector rerouted events are posted through.
    #[must_use]
    pub const fn injector(&self) -> &'a I { self.injector }

    /// Returns the system-wide accessibility root, creating it on first call.
    ///
    /// Once this epoch has observed a denial, no accessibility call is made
    /// until the next reset.
    ///
    /// # Errors
    ///
    /// Returns [`TopscrollError::PermissionDenied`] if the process is not
    /// trusted, or the error reported by the platform when creation fails.
    pub fn acquire_accessibility_root(&self) -> Result<&'a T::Root, TopscrollError> {
        if self.state.permission() == PermissionState::Denied {
            return Err(TopscrollError::PermissionDenied);
        }

        let slot = self.state.root_slot();
        if let Some(root) = slot.get() {
            return Ok(root);
        }

        if !self.tree.is_process_trusted() {
            tracing::debug!(epoch = self.state.epoch(), "accessibility not trusted");
            self.state.set_permission(PermissionState::Denied);
            return Err(TopscrollError::PermissionDenied);
        }

        let root = self.tree.create_root().inspect_err(|err| {
            if matches!(err, TopscrollError::PermissionDenied) {
                self.state.set_permission(PermissionState::Denied);
            }
        })?;

        self.state.set_permission(PermissionState::Granted);
        tracing::debug!(epoch = self.state.epoch(), "acquired accessibility root");
        Ok(slot.get_or_init(move || root))
    }

    /// Returns the event source used to stamp synthetic events.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the source cannot be created.
    pub fn acquire_event_source(&self) -> Result<&'a I::Source, TopscrollError> {
        let slot = self.state.source_slot();
        if let Some(source) = slot.get() {
            return Ok(source);
        }

        let source = self.injector.create_source()?;
        tracing::debug!(epoch = self.state.epoch(), "created event source");
        Ok(slot.get_or_init(move || source))
    }
}
