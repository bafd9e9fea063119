//! Lookup diagnostics for the `probe` command.
//!
//! Runs the same bounded walk as the decision engine but records every hop,
//! so a user can see why a position is or is not rerouted.

use serde::Serialize;
use smallvec::SmallVec;

use crate::error::{LookupFailure, TopscrollError};
use crate::routing::accessor::{AccessibilityTree, EventInjector};
use crate::routing::binder::ResourceBinder;
use crate::routing::engine::{find_delivery_point, find_scrollable_target};
use crate::routing::types::{DeviceClass, Point, Rect, ScrollEvent};

/// Most lookups settle within a handful of hops.
pub type HopList = SmallVec<[ProbeHop; 8]>;

/// One element visited during the walk.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeHop {
    pub hop: usize,
    pub role: Option<String>,
    pub scrollable: bool,
    pub frame: Option<Rect>,
}

/// Result of probing one screen position.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub position: Point,
    pub epoch: u64,
    pub hop_limit: usize,
    pub hops: HopList,
    /// Frame of the scrollable element that was found.
    pub target_frame: Option<Rect>,
    pub target_role: Option<String>,
    /// Whether the OS would already deliver to the target. `None` if unknown.
    pub natural_is_target: Option<bool>,
    /// Where a rerouted event would be posted.
    pub delivery_point: Option<Point>,
    /// `reroute` or `pass-through`.
    pub verdict: &'static str,
    pub failure: Option<LookupFailure>,
}

impl ProbeReport {
    /// Walks the tree at `position` and records every hop.
    ///
    /// Lookup failures are part of the report; only a failure to obtain the
    /// accessibility root is an error.
    ///
    /// # Errors
    ///
    /// Returns [`TopscrollError::PermissionDenied`] if accessibility is not
    /// granted, or the platform error if the root cannot be created.
    pub fn collect<T, I>(
        binder: &ResourceBinder<'_, T, I>,
        position: Point,
        hop_limit: usize,
    ) -> Result<Self, TopscrollError>
    where
        T: AccessibilityTree,
        I: EventInjector,
    {
        let tree = binder.tree();
        let root = binder.acquire_accessibility_root()?;

        let mut report = Self {
            position,
            epoch: binder.state().epoch(),
            hop_limit,
            hops: SmallVec::new(),
            target_frame: None,
            target_role: None,
            natural_is_target: None,
            delivery_point: None,
            verdict: "pass-through",
            failure: None,
        };

        let mut hops = HopList::new();
        let found = find_scrollable_target(tree, root, position, hop_limit, |hop, caps| {
            hops.push(ProbeHop {
                hop,
                role: caps.role.clone(),
                scrollable: caps.scrollable,
                frame: caps.frame,
            });
        });
        report.hops = hops;

        let found = match found {
            Ok(found) => found,
            Err(err) => {
                report.failure = Some(into_failure(err));
                return Ok(report);
            }
        };

        report.target_frame = Some(found.target.frame());
        report.target_role = found.target.role().map(str::to_string);

        let event = ScrollEvent::new(position, 0.0, 0.0, DeviceClass::Wheel);
        let natural = match tree.natural_target(root, &event, &found.hit) {
            Ok(natural) => natural,
            Err(err) => {
                report.failure = Some(into_failure(err));
                return Ok(report);
            }
        };

        let same = natural.as_ref().map(|natural| natural == found.target.handle());
        report.natural_is_target = same;
        if same == Some(true) {
            return Ok(report);
        }

        match find_delivery_point(tree, root, position, &found, natural.as_ref(), hop_limit) {
            Ok(point) => {
                report.delivery_point = Some(point);
                report.verdict = "reroute";
            }
            Err(err) => report.failure = Some(into_failure(err)),
        }

        Ok(report)
    }
}

fn into_failure(err: TopscrollError) -> LookupFailure {
    match err {
        TopscrollError::LookupFailed(failure) => failure,
        other => LookupFailure::Query(other.to_string()),
    }
}
