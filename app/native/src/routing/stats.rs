//! Decision counters.
//!
//! Plain relaxed atomics: the counters are diagnostics only and never gate
//! behavior, so they are bumped from the tap thread without coordination.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::routing::engine::{Decision, DecisionOutcome};
use crate::routing::types::RoutingVerdict;

/// Live counters owned by the scroll controller.
#[derive(Debug, Default)]
pub struct DecisionStats {
    decisions: AtomicU64,
    reroutes: AtomicU64,
    pass_throughs: AtomicU64,
    suppressions: AtomicU64,
    lookup_failures: AtomicU64,
    injection_failures: AtomicU64,
    stale_recoveries: AtomicU64,
    resets: AtomicU64,
}

/// Point-in-time copy of [`DecisionStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub decisions: u64,
    pub reroutes: u64,
    pub pass_throughs: u64,
    pub suppressions: u64,
    pub lookup_failures: u64,
    pub injection_failures: u64,
    pub stale_recoveries: u64,
    pub resets: u64,
}

impl DecisionStats {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Records a finished decision.
    pub fn record<E>(&self, decision: &Decision<E>) {
        self.decisions.fetch_add(1, Ordering::Relaxed);
        let counter = match decision.verdict {
            RoutingVerdict::PassThrough => &self.pass_throughs,
            RoutingVerdict::Reroute(_) => &self.reroutes,
            RoutingVerdict::Suppress => &self.suppressions,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if matches!(decision.outcome, DecisionOutcome::LookupFailed(_)) {
            self.lookup_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_injection_failure(&self) {
        self.injection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_recovery(&self) { self.stale_recoveries.fetch_add(1, Ordering::Relaxed); }

    pub fn record_reset(&self) { self.resets.fetch_add(1, Ordering::Relaxed); }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            decisions: self.decisions.load(Ordering::Relaxed),
            reroutes: self.reroutes.load(Ordering::Relaxed),
            pass_throughs: self.pass_throughs.load(Ordering::Relaxed),
            suppressions: self.suppressions.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            injection_failures: self.injection_failures.load(Ordering::Relaxed),
            stale_recoveries: self.stale_recoveries.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}
