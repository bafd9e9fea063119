//! Decision engine: the per-event routing state machine.
//!
//! # Stages
//!
//! ```text
//! Received ─► EligibilityCheck ─┬─► (ineligible) ──────────────────────► Done
//!                               └─► ElementLookup ─► VerdictAssembly ─► Done
//! ```
//!
//! - **EligibilityCheck** rejects our own synthetic events, filtered device
//!   classes, a disabled feature, and epochs that already saw a permission
//!   denial. None of these checks touches the accessibility layer.
//! - **ElementLookup** hit-tests the pointer position and walks up to the
//!   nearest scrollable element, never more than `hopLimit` parent hops.
//! - **VerdictAssembly** compares the discovered target with the element the
//!   OS would have picked and only reroutes when they differ. A reroute also
//!   needs a delivery point: a position whose hit test resolves to the target
//!   and not to the natural recipient. Without one the event passes through.
//!
//! # Gesture memory
//!
//! A trackpad gesture is decided once, at `Began`. Its continuation events
//! reuse the latched verdict while the epoch is unchanged. If a reset lands
//! mid-gesture, momentum events of a rerouted gesture are suppressed and
//! direct-input continuations are decided afresh.
//!
//! Cached and latched reroutes are served only after re-checking that the
//! process is still trusted, so a revocation takes effect on the next event.
//!
//! Failures are not remembered: a failed lookup yields `PassThrough` for this
//! event and the next event tries again.

use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::config::ScrollConfig;
use crate::error::{LookupFailure, TopscrollError};
use crate::routing::accessor::{AccessibilityTree, EventInjector};
use crate::routing::binder::ResourceBinder;
use crate::routing::state::{GlobalState, PermissionState};
use crate::routing::types::{
    ElementCapabilities, Point, Rect, RoutingVerdict, ScrollEvent, TargetElement,
};

/// Distance kept from the natural recipient's edge when moving a delivery point off it.
const EDGE_GAP: f64 = 2.0;

// ============================================================================
// Stages & Outcomes
// ============================================================================

/// Stage of the per-event state machine, recorded for tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionStage {
    Received,
    EligibilityCheck,
    ElementLookup,
    VerdictAssembly,
    Done,
}

/// Why an event was rejected by the eligibility check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ineligible {
    /// Rerouting is turned off in preferences.
    Disabled,
    /// The event was produced by this process.
    Synthetic,
    /// The device class is not in the configured filter.
    UnsupportedDevice,
    /// Accessibility was denied earlier in this epoch.
    PermissionDenied,
}

/// How a verdict was reached.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionOutcome {
    /// Rejected before any accessibility call.
    Ineligible(Ineligible),
    /// Reused the verdict latched at the start of the current gesture.
    Latched,
    /// Served from the snapshot's lookup cache.
    Cached,
    /// Looked up in the accessibility tree.
    Resolved,
    /// Accessibility authorization failed during this decision.
    PermissionDenied,
    /// The root handle was reported invalid; the caller should re-acquire.
    StaleRoot,
    /// Lookup failed or exceeded its bound.
    LookupFailed(LookupFailure),
    /// Momentum of a rerouted gesture outlived its epoch.
    StaleMomentum,
}

/// Verdict plus the path that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision<E> {
    pub verdict: RoutingVerdict<E>,
    pub outcome: DecisionOutcome,
}

impl<E> Decision<E> {
    const fn pass(outcome: DecisionOutcome) -> Self {
        Self { verdict: RoutingVerdict::PassThrough, outcome }
    }
}

// ============================================================================
// Element Lookup
// ============================================================================

/// Element under a position and the nearest scrollable element above it.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollLookup<E> {
    /// The element hit-tested at the position.
    pub hit: E,
    pub target: TargetElement<E>,
}

/// Walks from the element under `position` to the nearest scrollable element.
///
/// Hop 0 is the hit-tested element itself; the walk visits at most
/// `hop_limit` parents after it. `on_hop` sees every visited element's
/// capabilities in order, which lets diagnostics record the path without
/// slowing down the hot path.
///
/// Ties between several scrollable ancestors are resolved by proximity: the
/// first scrollable element on the way up wins.
///
/// # Errors
///
/// Returns [`LookupFailure::HopLimitExceeded`] if no scrollable element is
/// found within the bound, [`LookupFailure::NoScrollableAncestor`] if the walk
/// reaches the top of the tree, or the accessibility error of a failed query.
pub fn find_scrollable_target<T, F>(
    tree: &T,
    root: &T::Root,
    position: Point,
    hop_limit: usize,
    on_hop: F,
) -> Result<ScrollLookup<T::Element>, TopscrollError>
where
    T: AccessibilityTree,
    F: FnMut(usize, &ElementCapabilities),
{
    let hit = tree.element_at(root, position)?;
    let target = nearest_scrollable(tree, hit.clone(), hop_limit, on_hop)?;
    Ok(ScrollLookup { hit, target })
}

fn nearest_scrollable<T, F>(
    tree: &T,
    start: T::Element,
    hop_limit: usize,
    mut on_hop: F,
) -> Result<TargetElement<T::Element>, TopscrollError>
where
    T: AccessibilityTree,
    F: FnMut(usize, &ElementCapabilities),
{
    let mut element = start;

    for hop in 0..=hop_limit {
        let capabilities = tree.capabilities(&element)?;
        on_hop(hop, &capabilities);

        if let Some(target) = TargetElement::from_capabilities(element.clone(), capabilities) {
            return Ok(target);
        }

        if hop == hop_limit {
            break;
        }

        element = tree.parent(&element)?.ok_or(LookupFailure::NoScrollableAncestor)?;
    }

    Err(LookupFailure::HopLimitExceeded { limit: hop_limit }.into())
}

// ============================================================================
// Delivery Point
// ============================================================================

/// Positions worth trying as the delivery point of a reroute, best first.
///
/// The original position (pulled inside the target when it lies outside)
/// comes first. When the natural recipient's frame is known, the points just
/// past each of its edges follow, nearest first. The target's center is last.
/// Points inside the natural recipient's frame are skipped after the first.
#[must_use]
pub fn delivery_candidates(original: Point, target: Rect, natural: Option<Rect>) -> SmallVec<[Point; 6]> {
    let mut candidates = SmallVec::new();
    let first = if target.contains(original) { original } else { target.clamp_point(original, EDGE_GAP) };
    candidates.push(first);

    let usable = |point: Point| {
        target.contains(point) && !natural.is_some_and(|frame| frame.contains(point)) && point != first
    };

    if let Some(frame) = natural {
        let mut edges: SmallVec<[Point; 4]> = [
            Point::new(frame.x - EDGE_GAP, original.y),
            Point::new(frame.max_x() + EDGE_GAP, original.y),
            Point::new(original.x, frame.y - EDGE_GAP),
            Point::new(original.x, frame.max_y() + EDGE_GAP),
        ]
        .into_iter()
        .filter(|point| usable(*point))
        .collect();
        edges.sort_by(|a, b| distance_sq(original, *a).total_cmp(&distance_sq(original, *b)));
        candidates.extend(edges);
    }

    let center = target.center();
    if usable(center) && !candidates.contains(&center) {
        candidates.push(center);
    }
    candidates
}

fn distance_sq(a: Point, b: Point) -> f64 { (a.x - b.x).powi(2) + (a.y - b.y).powi(2) }

/// Finds a position that the OS will hand to `lookup.target` rather than to `natural`.
///
/// A candidate qualifies when its hit-tested element is not the natural
/// recipient and its nearest scrollable element is the target. The original
/// position is judged from `lookup` without querying again.
///
/// # Errors
///
/// Returns [`LookupFailure::NoDeliveryPoint`] when no candidate qualifies.
/// Permission and stale-handle errors are propagated; other lookup failures
/// only disqualify the candidate.
pub fn find_delivery_point<T>(
    tree: &T,
    root: &T::Root,
    original: Point,
    lookup: &ScrollLookup<T::Element>,
    natural: Option<&T::Element>,
    hop_limit: usize,
) -> Result<Point, TopscrollError>
where
    T: AccessibilityTree,
{
    let is_natural = |element: &T::Element| natural.is_some_and(|natural| natural == element);
    let target = &lookup.target;
    if target.frame().contains(original) && !is_natural(&lookup.hit) {
        return Ok(original);
    }

    let natural_frame =
        natural.and_then(|natural| tree.capabilities(natural).ok()).and_then(|caps| caps.frame);

    for candidate in delivery_candidates(original, target.frame(), natural_frame) {
        if candidate == original {
            continue;
        }

        let hit = match tree.element_at(root, candidate) {
            Ok(hit) => hit,
            Err(TopscrollError::LookupFailed(_)) => continue,
            Err(err) => return Err(err),
        };
        if is_natural(&hit) {
            continue;
        }
        match nearest_scrollable(tree, hit, hop_limit, |_, _| {}) {
            Ok(found) if found.handle() == target.handle() => return Ok(candidate),
            Ok(_) | Err(TopscrollError::LookupFailed(_)) => {}
            Err(err) => return Err(err),
        }
    }

    Err(LookupFailure::NoDeliveryPoint.into())
}

/// Runs `query` and converts a panic inside the accessibility layer into a lookup failure.
fn isolate<R>(query: impl FnOnce() -> Result<R, TopscrollError>) -> Result<R, TopscrollError> {
    catch_unwind(AssertUnwindSafe(query))
        .unwrap_or_else(|_| Err(LookupFailure::QueryPanicked.into()))
}

// ============================================================================
// Gesture Latch
// ============================================================================

/// Verdict remembered for the gesture in progress.
#[derive(Clone, Debug)]
struct GestureLatch<E> {
    epoch: u64,
    verdict: RoutingVerdict<E>,
}

/// What the latch says about a continuation event.
enum LatchAnswer<E> {
    /// No usable latch; decide from scratch.
    Miss,
    /// Same epoch; reuse this verdict.
    Reuse(RoutingVerdict<E>),
    /// Epoch changed under a rerouted gesture's momentum.
    StaleMomentum,
}

// ============================================================================
// Decision Engine
// ============================================================================

/// The per-event decision state machine.
///
/// Apart from the gesture latch the engine is stateless; all caches live in
/// the epoch snapshot reached through the [`ResourceBinder`].
pub struct DecisionEngine<E> {
    latch: Mutex<Option<GestureLatch<E>>>,
}

impl<E> Default for DecisionEngine<E> {
    fn default() -> Self { Self { latch: Mutex::new(None) } }
}

impl<E: Clone + PartialEq + Debug> DecisionEngine<E> {
    /// Creates an engine with no gesture in progress.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Decides how `event` should be routed.
    ///
    /// Never fails: every error resolves to a verdict, and the outcome says why.
    pub fn decide<T, I>(
        &self,
        event: &ScrollEvent,
        config: &ScrollConfig,
        binder: &ResourceBinder<'_, T, I>,
    ) -> Decision<E>
    where
        T: AccessibilityTree<Element = E>,
        I: EventInjector,
    {
        let state = binder.state();
        let tree = binder.tree();
        trace_stage(DecisionStage::Received, event);

        trace_stage(DecisionStage::EligibilityCheck, event);
        if let Some(reason) = check_eligibility(event, config, state.permission()) {
            return finish(Decision::pass(DecisionOutcome::Ineligible(reason)));
        }

        match self.consult_latch(event, state.epoch(), config) {
            LatchAnswer::Reuse(verdict) => {
                return finish(replay(tree, state, verdict, DecisionOutcome::Latched));
            }
            LatchAnswer::StaleMomentum => {
                return finish(Decision {
                    verdict: RoutingVerdict::Suppress,
                    outcome: DecisionOutcome::StaleMomentum,
                });
            }
            LatchAnswer::Miss => {}
        }

        let ttl_ns = config.lookup_cache_ttl_ns();
        if let Some(verdict) = state.cached_verdict(event.position, event.timestamp_ns, ttl_ns) {
            let decision = replay(tree, state, verdict, DecisionOutcome::Cached);
            self.remember(event, state.epoch(), &decision.verdict);
            return finish(decision);
        }

        trace_stage(DecisionStage::ElementLookup, event);
        let root = match binder.acquire_accessibility_root() {
            Ok(root) => root,
            Err(TopscrollError::PermissionDenied) => {
                return finish(Decision::pass(DecisionOutcome::PermissionDenied));
            }
            Err(err) => return finish(Decision::pass(failure_outcome(err))),
        };

        let hop_limit = config.hop_limit;
        let lookup = isolate(|| {
            let found = find_scrollable_target(tree, root, event.position, hop_limit, |_, _| {})?;
            let natural = tree.natural_target(root, event, &found.hit)?;
            trace_stage(DecisionStage::VerdictAssembly, event);
            match assemble_verdict(found.target.clone(), natural.as_ref()) {
                RoutingVerdict::Reroute(target) => {
                    let point =
                        find_delivery_point(tree, root, event.position, &found, natural.as_ref(), hop_limit)?;
                    Ok(RoutingVerdict::Reroute(target.with_delivery_point(point)))
                }
                verdict => Ok(verdict),
            }
        });

        let decision = match lookup {
            Ok(verdict) => {
                state.remember_verdict(event.position, event.timestamp_ns, &verdict);
                self.remember(event, state.epoch(), &verdict);
                Decision { verdict, outcome: DecisionOutcome::Resolved }
            }
            Err(TopscrollError::PermissionDenied) => {
                state.set_permission(PermissionState::Denied);
                tracing::debug!(epoch = state.epoch(), "accessibility disabled during lookup");
                Decision::pass(DecisionOutcome::PermissionDenied)
            }
            Err(err) => Decision::pass(failure_outcome(err)),
        };

        finish(decision)
    }

    /// Returns whether a gesture verdict is currently latched.
    #[must_use]
    pub fn has_gesture(&self) -> bool { self.latch.lock().is_some() }

    fn consult_latch(&self, event: &ScrollEvent, epoch: u64, config: &ScrollConfig) -> LatchAnswer<E> {
        let phase = event.phase;
        let mut latch = self.latch.lock();

        if !phase.continues_gesture() {
            if phase.starts_gesture() {
                *latch = None;
            }
            return LatchAnswer::Miss;
        }

        let answer = match latch.as_ref() {
            Some(current) if current.epoch == epoch => LatchAnswer::Reuse(current.verdict.clone()),
            Some(current)
                if phase.is_momentum()
                    && config.suppress_stale_momentum
                    && matches!(current.verdict, RoutingVerdict::Reroute(_)) =>
            {
                LatchAnswer::StaleMomentum
            }
            _ => LatchAnswer::Miss,
        };

        if phase.ends_gesture() {
            *latch = None;
        }
        answer
    }

    fn remember(&self, event: &ScrollEvent, epoch: u64, verdict: &RoutingVerdict<E>) {
        let phase = event.phase;
        if phase.ends_gesture() || !(phase.starts_gesture() || phase.continues_gesture()) {
            return;
        }
        *self.latch.lock() = Some(GestureLatch { epoch, verdict: verdict.clone() });
    }
}

/// Serves a remembered verdict, re-checking trust before a reroute is reused.
fn replay<T, S>(
    tree: &T,
    state: &GlobalState<T::Root, S, T::Element>,
    verdict: RoutingVerdict<T::Element>,
    outcome: DecisionOutcome,
) -> Decision<T::Element>
where
    T: AccessibilityTree,
{
    if matches!(verdict, RoutingVerdict::Reroute(_)) && !tree.is_process_trusted() {
        state.set_permission(PermissionState::Denied);
        tracing::debug!(epoch = state.epoch(), ?outcome, "accessibility revoked, dropping remembered reroute");
        return Decision::pass(DecisionOutcome::PermissionDenied);
    }
    Decision { verdict, outcome }
}

/// Returns the reason `event` must not be intercepted, if any.
fn check_eligibility(
    event: &ScrollEvent,
    config: &ScrollConfig,
    permission: PermissionState,
) -> Option<Ineligible> {
    if event.is_synthetic() {
        return Some(Ineligible::Synthetic);
    }
    if !config.enabled {
        return Some(Ineligible::Disabled);
    }
    if !config.accepts_device(event.device) {
        return Some(Ineligible::UnsupportedDevice);
    }
    if permission == PermissionState::Denied {
        return Some(Ineligible::PermissionDenied);
    }
    None
}

/// Reroutes only when the discovered target is not already the natural recipient.
fn assemble_verdict<E: PartialEq>(target: TargetElement<E>, natural: Option<&E>) -> RoutingVerdict<E> {
    if natural.is_some_and(|natural| natural == target.handle()) {
        RoutingVerdict::PassThrough
    } else {
        RoutingVerdict::Reroute(target)
    }
}

fn failure_outcome(err: TopscrollError) -> DecisionOutcome {
    match err {
        TopscrollError::StaleHandle => DecisionOutcome::StaleRoot,
        TopscrollError::LookupFailed(failure) => DecisionOutcome::LookupFailed(failure),
        other => DecisionOutcome::LookupFailed(LookupFailure::Query(other.to_string())),
    }
}

fn trace_stage(stage: DecisionStage, event: &ScrollEvent) {
    tracing::trace!(
        ?stage,
        x = event.position.x,
        y = event.position.y,
        phase = ?event.phase,
        "scroll decision"
    );
}

fn finish<E>(decision: Decision<E>) -> Decision<E> {
    tracing::trace!(
        stage = ?DecisionStage::Done,
        verdict = decision.verdict.label(),
        outcome = ?decision.outcome,
        "scroll decision"
    );
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::binder::PlatformState;
    use crate::routing::testing::{FakeInjector, FakeTree};
    use crate::routing::types::{DeviceClass, EventOrigin, Rect, ScrollPhase, SourceTag};

    const FRAME: Rect = Rect::new(0.0, 0.0, 400.0, 300.0);

    fn event() -> ScrollEvent {
        ScrollEvent::new(Point::new(50.0, 50.0), 0.0, -4.0, DeviceClass::Trackpad)
    }

    fn no_cache() -> ScrollConfig { ScrollConfig { lookup_cache_ttl_ms: 0, ..ScrollConfig::default() } }

    struct Rig {
        tree: FakeTree,
        injector: FakeInjector,
        engine: DecisionEngine<u32>,
    }

    impl Rig {
        fn new() -> Self {
            Self { tree: FakeTree::new(), injector: FakeInjector::new(), engine: DecisionEngine::new() }
        }

        fn decide_in(
            &self,
            state: &PlatformState<FakeTree, FakeInjector>,
            event: &ScrollEvent,
            config: &ScrollConfig,
        ) -> Decision<u32> {
            let binder = ResourceBinder::new(&self.tree, &self.injector, state);
            self.engine.decide(event, config, &binder)
        }
    }

    #[test]
    fn test_find_target_walks_to_nearest_scrollable() {
        let tree = FakeTree::new();
        tree.chain(&[1, 2, 3, 4], &[3, 4], FRAME);
        let mut visited = Vec::new();
        let found = find_scrollable_target(&tree, &0, Point::new(5.0, 5.0), 8, |hop, caps| {
            visited.push((hop, caps.scrollable));
        })
        .unwrap();
        assert_eq!(found.hit, 1);
        assert_eq!(*found.target.handle(), 3);
        assert_eq!(visited, vec![(0, false), (1, false), (2, true)]);
    }

    #[test]
    fn test_find_target_respects_hop_limit() {
        let tree = FakeTree::new();
        tree.chain(&[1, 2, 3], &[3], FRAME);
        let err = find_scrollable_target(&tree, &0, Point::new(5.0, 5.0), 1, |_, _| {}).unwrap_err();
        assert!(matches!(
            err,
            TopscrollError::LookupFailed(LookupFailure::HopLimitExceeded { limit: 1 })
        ));
        // Hit test, then capabilities + parent for hop 0, capabilities for hop 1.
        assert_eq!(tree.calls(), 4);
    }

    #[test]
    fn test_find_target_reports_missing_ancestor() {
        let tree = FakeTree::new();
        tree.chain(&[1, 2], &[], FRAME);
        let err = find_scrollable_target(&tree, &0, Point::new(5.0, 5.0), 8, |_, _| {}).unwrap_err();
        assert!(matches!(
            err,
            TopscrollError::LookupFailed(LookupFailure::NoScrollableAncestor)
        ));
    }

    #[test]
    fn test_zero_hop_limit_accepts_only_the_hit_element() {
        let tree = FakeTree::new();
        tree.chain(&[1, 2], &[1, 2], FRAME);
        let found = find_scrollable_target(&tree, &0, Point::new(5.0, 5.0), 0, |_, _| {}).unwrap();
        assert_eq!(*found.target.handle(), 1);

        let tree = FakeTree::new();
        tree.chain(&[1, 2], &[2], FRAME);
        let err = find_scrollable_target(&tree, &0, Point::new(5.0, 5.0), 0, |_, _| {}).unwrap_err();
        assert!(matches!(
            err,
            TopscrollError::LookupFailed(LookupFailure::HopLimitExceeded { limit: 0 })
        ));
    }

    #[test]
    fn test_delivery_candidates_step_off_natural_frame() {
        let target = Rect::new(0.0, 0.0, 400.0, 300.0);
        let natural = Rect::new(100.0, 100.0, 50.0, 20.0);
        let candidates = delivery_candidates(Point::new(110.0, 110.0), target, Some(natural));

        assert_eq!(candidates[0], Point::new(110.0, 110.0));
        // Left edge is 12px away, bottom 12px, top 12px, right 42px.
        assert_eq!(candidates[1], Point::new(98.0, 110.0));
        assert_eq!(candidates.last(), Some(&Point::new(200.0, 150.0)));
        assert!(candidates[1..].iter().all(|point| !natural.contains(*point)));
        assert!(candidates.iter().all(|point| target.contains(*point)));
    }

    #[test]
    fn test_delivery_candidates_pull_outside_position_into_target() {
        let target = Rect::new(100.0, 100.0, 50.0, 20.0);
        let candidates = delivery_candidates(Point::new(0.0, 110.0), target, None);
        assert_eq!(candidates[0], Point::new(102.0, 110.0));
        assert_eq!(candidates[1], Point::new(125.0, 110.0));
    }

    #[test]
    fn test_reroute_delivers_where_target_is_hit_not_natural() {
        let rig = Rig::new();
        // Scroll area 3 holds group 2, which holds a small leaf 1 under the pointer.
        rig.tree.add(3, None, true, FRAME);
        rig.tree.add(2, Some(3), false, FRAME);
        rig.tree.add(1, Some(2), false, Rect::new(40.0, 40.0, 30.0, 20.0));
        rig.tree.expose(2);
        rig.tree.expose(1);
        rig.tree.set_natural_target(Some(1));
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);

        let decision = rig.decide_in(&state, &event(), &no_cache());
        let target = decision.verdict.target().unwrap();
        assert_eq!(*target.handle(), 3);

        let point = target.delivery_point();
        assert_ne!(point, event().position);
        let binder = ResourceBinder::new(&rig.tree, &rig.injector, &state);
        let root = binder.acquire_accessibility_root().unwrap();
        let found = find_scrollable_target(&rig.tree, root, point, 8, |_, _| {}).unwrap();
        assert_ne!(found.hit, 1);
        assert_eq!(*found.target.handle(), 3);
    }

    #[test]
    fn test_reroute_without_delivery_point_passes_through() {
        let rig = Rig::new();
        // The natural recipient covers the whole target, so every point hits it.
        rig.tree.chain(&[1, 2], &[2], FRAME);
        rig.tree.set_natural_target(Some(1));
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);

        let decision = rig.decide_in(&state, &event(), &no_cache());
        assert_eq!(decision.verdict, RoutingVerdict::PassThrough);
        assert_eq!(
            decision.outcome,
            DecisionOutcome::LookupFailed(LookupFailure::NoDeliveryPoint)
        );
        assert!(!state.has_cached_lookup());
    }

    #[test]
    fn test_reroutes_when_target_differs_from_natural() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2, 3], &[3], FRAME);
        rig.tree.set_natural_target(Some(99));
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);

        let decision = rig.decide_in(&state, &event(), &no_cache());
        assert_eq!(decision.outcome, DecisionOutcome::Resolved);
        assert_eq!(decision.verdict.target().map(|t| *t.handle()), Some(3));
    }

    #[test]
    fn test_passes_through_when_target_is_natural() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[1], FRAME);
        rig.tree.set_natural_target(Some(1));
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);

        let decision = rig.decide_in(&state, &event(), &no_cache());
        assert_eq!(decision.verdict, RoutingVerdict::PassThrough);
    }

    #[test]
    fn test_unknown_natural_target_reroutes() {
        let rig = Rig::new();
        rig.tree.chain(&[1], &[1], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);

        let decision = rig.decide_in(&state, &event(), &no_cache());
        assert!(decision.verdict.target().is_some());
    }

    #[test]
    fn test_synthetic_event_is_ineligible_without_queries() {
        let rig = Rig::new();
        rig.tree.chain(&[1], &[1], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let synthetic = event().with_origin(EventOrigin::Synthetic(SourceTag(1)));

        let decision = rig.decide_in(&state, &synthetic, &no_cache());
        assert_eq!(decision.outcome, DecisionOutcome::Ineligible(Ineligible::Synthetic));
        assert_eq!(rig.tree.calls(), 0);
    }

    #[test]
    fn test_filtered_device_is_ineligible() {
        let rig = Rig::new();
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = ScrollConfig { device_filter: vec![DeviceClass::Wheel], ..no_cache() };

        let decision = rig.decide_in(&state, &event(), &config);
        assert_eq!(decision.outcome, DecisionOutcome::Ineligible(Ineligible::UnsupportedDevice));
    }

    #[test]
    fn test_disabled_config_is_ineligible() {
        let rig = Rig::new();
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = ScrollConfig { enabled: false, ..no_cache() };

        let decision = rig.decide_in(&state, &event(), &config);
        assert_eq!(decision.outcome, DecisionOutcome::Ineligible(Ineligible::Disabled));
    }

    #[test]
    fn test_transient_failure_passes_through_and_is_not_remembered() {
        let rig = Rig::new();
        rig.tree.chain(&[1], &[1], FRAME);
        rig.tree.set_natural_target(Some(7));
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);

        rig.tree.set_failing(true);
        let failed = rig.decide_in(&state, &event(), &ScrollConfig::default());
        assert!(matches!(failed.outcome, DecisionOutcome::LookupFailed(_)));
        assert!(!state.has_cached_lookup());

        rig.tree.set_failing(false);
        let recovered = rig.decide_in(&state, &event(), &ScrollConfig::default());
        assert_eq!(recovered.outcome, DecisionOutcome::Resolved);
    }

    #[test]
    fn test_panicking_tree_is_isolated() {
        let rig = Rig::new();
        rig.tree.chain(&[1], &[1], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        // Root acquisition happens before the isolated walk.
        let binder = ResourceBinder::new(&rig.tree, &rig.injector, &state);
        binder.acquire_accessibility_root().unwrap();

        rig.tree.set_panicking(true);
        let decision = rig.decide_in(&state, &event(), &no_cache());
        assert_eq!(
            decision.outcome,
            DecisionOutcome::LookupFailed(LookupFailure::QueryPanicked)
        );
        assert_eq!(decision.verdict, RoutingVerdict::PassThrough);
    }

    #[test]
    fn test_api_disabled_marks_epoch_denied() {
        let rig = Rig::new();
        rig.tree.chain(&[1], &[1], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let binder = ResourceBinder::new(&rig.tree, &rig.injector, &state);
        binder.acquire_accessibility_root().unwrap();

        rig.tree.set_api_disabled(true);
        let decision = rig.decide_in(&state, &event(), &no_cache());
        assert_eq!(decision.outcome, DecisionOutcome::PermissionDenied);
        assert_eq!(state.permission(), PermissionState::Denied);

        let calls = rig.tree.calls();
        let next = rig.decide_in(&state, &event(), &no_cache());
        assert_eq!(next.outcome, DecisionOutcome::Ineligible(Ineligible::PermissionDenied));
        assert_eq!(rig.tree.calls(), calls);
    }

    #[test]
    fn test_cache_serves_repeat_position() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = ScrollConfig::default();

        let wheel = ScrollEvent::new(Point::new(10.0, 10.0), 0.0, -1.0, DeviceClass::Wheel);
        let first = rig.decide_in(&state, &wheel.with_timestamp(1_000_000), &config);
        let calls = rig.tree.calls();
        let second = rig.decide_in(&state, &wheel.with_timestamp(2_000_000), &config);

        assert_eq!(first.outcome, DecisionOutcome::Resolved);
        assert_eq!(second.outcome, DecisionOutcome::Cached);
        assert_eq!(first.verdict, second.verdict);
        assert_eq!(rig.tree.calls(), calls);
    }

    #[test]
    fn test_cached_reroute_rechecks_trust() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = ScrollConfig::default();

        let wheel = ScrollEvent::new(Point::new(10.0, 10.0), 0.0, -1.0, DeviceClass::Wheel);
        let first = rig.decide_in(&state, &wheel.with_timestamp(1_000_000_000), &config);
        assert!(first.verdict.target().is_some());

        rig.tree.set_trusted(false);
        let second = rig.decide_in(&state, &wheel.with_timestamp(1_010_000_000), &config);
        assert_eq!(second.verdict, RoutingVerdict::PassThrough);
        assert_eq!(second.outcome, DecisionOutcome::PermissionDenied);
        assert_eq!(state.permission(), PermissionState::Denied);
    }

    #[test]
    fn test_latched_reroute_rechecks_trust() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = no_cache();

        let began = rig.decide_in(&state, &event().with_phase(ScrollPhase::Began), &config);
        assert!(began.verdict.target().is_some());

        rig.tree.set_trusted(false);
        let changed = rig.decide_in(&state, &event().with_phase(ScrollPhase::Changed), &config);
        assert_eq!(changed.outcome, DecisionOutcome::PermissionDenied);
        assert_eq!(state.permission(), PermissionState::Denied);

        let ended = rig.decide_in(&state, &event().with_phase(ScrollPhase::Ended), &config);
        assert_eq!(ended.verdict, RoutingVerdict::PassThrough);
    }

    #[test]
    fn test_gesture_continuation_reuses_latched_verdict() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = no_cache();

        let began = rig.decide_in(&state, &event().with_phase(ScrollPhase::Began), &config);
        let calls = rig.tree.calls();
        let changed = rig.decide_in(&state, &event().with_phase(ScrollPhase::Changed), &config);

        assert_eq!(changed.outcome, DecisionOutcome::Latched);
        assert_eq!(changed.verdict, began.verdict);
        assert_eq!(rig.tree.calls(), calls);
    }

    #[test]
    fn test_stale_momentum_of_rerouted_gesture_is_suppressed() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let old = PlatformState::<FakeTree, FakeInjector>::new(0);
        let new = PlatformState::<FakeTree, FakeInjector>::new(1);
        let config = no_cache();

        let began = rig.decide_in(&old, &event().with_phase(ScrollPhase::Began), &config);
        assert!(began.verdict.target().is_some());

        let momentum = rig.decide_in(&new, &event().with_phase(ScrollPhase::Momentum), &config);
        assert_eq!(momentum.verdict, RoutingVerdict::Suppress);

        let ended = rig.decide_in(&new, &event().with_phase(ScrollPhase::MomentumEnded), &config);
        assert_eq!(ended.verdict, RoutingVerdict::Suppress);
        assert!(!rig.engine.has_gesture());
    }

    #[test]
    fn test_stale_direct_continuation_is_decided_again() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let old = PlatformState::<FakeTree, FakeInjector>::new(0);
        let new = PlatformState::<FakeTree, FakeInjector>::new(1);
        let config = no_cache();

        rig.decide_in(&old, &event().with_phase(ScrollPhase::Began), &config);
        let changed = rig.decide_in(&new, &event().with_phase(ScrollPhase::Changed), &config);
        assert_eq!(changed.outcome, DecisionOutcome::Resolved);
    }

    #[test]
    fn test_stale_momentum_passes_when_suppression_disabled() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let old = PlatformState::<FakeTree, FakeInjector>::new(0);
        let new = PlatformState::<FakeTree, FakeInjector>::new(1);
        let config = ScrollConfig { suppress_stale_momentum: false, ..no_cache() };

        rig.decide_in(&old, &event().with_phase(ScrollPhase::Began), &config);
        let momentum = rig.decide_in(&new, &event().with_phase(ScrollPhase::Momentum), &config);
        assert_ne!(momentum.verdict, RoutingVerdict::Suppress);
    }

    #[test]
    fn test_began_clears_previous_gesture() {
        let rig = Rig::new();
        rig.tree.chain(&[1, 2], &[2], FRAME);
        let state = PlatformState::<FakeTree, FakeInjector>::new(0);
        let config = no_cache();

        rig.decide_in(&state, &event().with_phase(ScrollPhase::Began), &config);
        rig.tree.set_natural_target(Some(2));
        let second = rig.decide_in(&state, &event().with_phase(ScrollPhase::Began), &config);
        assert_eq!(second.verdict, RoutingVerdict::PassThrough);
        assert_eq!(second.outcome, DecisionOutcome::Resolved);
    }
}
