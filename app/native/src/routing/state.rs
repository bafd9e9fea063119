//! Epoch-versioned global state.
//!
//! `GlobalState` holds everything that must be thrown away when the
//! environment changes: the native handles, the permission verdict and the
//! lookup cache. It is never mutated in place across epochs. A reset builds a
//! fresh snapshot and publishes it through [`StateCell`]; readers grab an `Arc`
//! to whichever snapshot is current and keep using it for the rest of the
//! event, so a decision sees either the old or the new state, never a mix.
//!
//! # Thread Safety
//!
//! The write lock in `StateCell` is only held for the pointer swap, and the
//! read lock only for an `Arc` clone. No lock is held while the accessibility
//! layer is queried. The lookup cache uses `try_lock`, so the tap thread never
//! waits on it.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::routing::types::{Point, RoutingVerdict};

// ============================================================================
// Permission State
// ============================================================================

/// Accessibility authorization as last observed within an epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PermissionState {
    /// Not checked yet in this epoch.
    Unknown = 0,
    /// Root handle acquired while trusted.
    Granted = 1,
    /// Trust check failed or a query reported the API as disabled.
    Denied = 2,
}

impl PermissionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Granted,
            2 => Self::Denied,
            _ => Self::Unknown,
        }
    }
}

// ============================================================================
// Lookup Cache
// ============================================================================

/// A verdict remembered for one pixel position.
#[derive(Clone, Debug)]
struct CachedLookup<E> {
    pixel: (i64, i64),
    recorded_at_ns: u64,
    verdict: RoutingVerdict<E>,
}

// ============================================================================
// Global State Snapshot
// ============================================================================

/// One generation of process-wide routing state.
pub struct GlobalState<R, S, E> {
    epoch: u64,
    accessibility_root: OnceLock<R>,
    event_source: OnceLock<S>,
    permission: AtomicU8,
    lookup_cache: Mutex<Option<CachedLookup<E>>>,
}

impl<R, S, E: Clone> GlobalState<R, S, E> {
    /// Creates an empty snapshot for the given epoch.
    #[must_use]
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            accessibility_root: OnceLock::new(),
            event_source: OnceLock::new(),
            permission: AtomicU8::new(PermissionState::Unknown as u8),
            lookup_cache: Mutex::new(None),
        }
    }

    /// The epoch this snapshot belongs to.
    #[must_use]
    pub const fn epoch(&self) -> u64 { self.epoch }

    /// Current permission state for this epoch.
    #[must_use]
    pub fn permission(&self) -> PermissionState {
        PermissionState::from_u8(self.permission.load(Ordering::Acquire))
    }

    /// Records a permission observation for this epoch.
    ///
    /// `Denied` is sticky: once seen, only a new epoch clears it.
    pub fn set_permission(&self, state: PermissionState) {
        if state == PermissionState::Denied {
            self.permission.store(state as u8, Ordering::Release);
            return;
        }
        let _ = self.permission.compare_exchange(
            PermissionState::Unknown as u8,
            state as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Root handle slot, filled lazily by the resource binder.
    pub(crate) const fn root_slot(&self) -> &OnceLock<R> { &self.accessibility_root }

    /// Event source slot, filled lazily by the resource binder.
    pub(crate) const fn source_slot(&self) -> &OnceLock<S> { &self.event_source }

    /// Returns whether any native handle has been created in this epoch.
    #[must_use]
    pub fn has_handles(&self) -> bool {
        self.accessibility_root.get().is_some() || self.event_source.get().is_some()
    }

    /// Returns a cached verdict for `position` if one was recorded within `ttl_ns`.
    ///
    /// Returns `None` on miss, expiry, or when the cache is momentarily busy.
    #[must_use]
    pub fn cached_verdict(
        &self,
        position: Point,
        now_ns: u64,
        ttl_ns: u64,
    ) -> Option<RoutingVerdict<E>> {
        if ttl_ns == 0 {
            return None;
        }
        let guard = self.lookup_cache.try_lock()?;
        let entry = guard.as_ref()?;
        let fresh = now_ns >= entry.recorded_at_ns && now_ns - entry.recorded_at_ns <= ttl_ns;
        (fresh && entry.pixel == position.pixel()).then(|| entry.verdict.clone())
    }

    /// Remembers a verdict for `position`. Skipped silently when the cache is busy.
    pub fn remember_verdict(&self, position: Point, now_ns: u64, verdict: &RoutingVerdict<E>) {
        if let Some(mut guard) = self.lookup_cache.try_lock() {
            *guard = Some(CachedLookup {
                pixel: position.pixel(),
                recorded_at_ns: now_ns,
                verdict: verdict.clone(),
            });
        }
    }

    /// Returns whether the lookup cache holds an entry.
    #[must_use]
    pub fn has_cached_lookup(&self) -> bool {
        self.lookup_cache.try_lock().is_some_and(|guard| guard.is_some())
    }
}

// ============================================================================
// State Cell
// ============================================================================

/// Atomically published holder of the current [`GlobalState`].
pub struct StateCell<R, S, E> {
    current: RwLock<Arc<GlobalState<R, S, E>>>,
    epoch: AtomicU64,
}

impl<R, S, E: Clone> Default for StateCell<R, S, E> {
    fn default() -> Self { Self::new() }
}

impl<R, S, E: Clone> StateCell<R, S, E> {
    /// Creates a cell holding an empty epoch-0 snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(GlobalState::new(0))),
            epoch: AtomicU64::new(0),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<GlobalState<R, S, E>> { Arc::clone(&self.current.read()) }

    /// Current epoch, read without touching the lock.
    #[must_use]
    pub fn epoch(&self) -> u64 { self.epoch.load(Ordering::Acquire) }

    /// Returns whether `state` is still the published snapshot.
    #[must_use]
    pub fn is_current(&self, state: &GlobalState<R, S, E>) -> bool { state.epoch == self.epoch() }

    /// Replaces the current snapshot with an empty one for the next epoch.
    ///
    /// Returns the new epoch.
    pub fn publish_fresh(&self) -> u64 {
        let mut current = self.current.write();
        let next = current.epoch.wrapping_add(1);
        let retired = std::mem::replace(&mut *current, Arc::new(GlobalState::new(next)));
        self.epoch.store(next, Ordering::Release);
        drop(current);

        // Native handles are released outside the lock.
        drop(retired);
        next
    }
}
