//! Shared in-memory platform for integration tests.
//!
//! `MemoryTree` models an accessibility hierarchy as `u32` element ids with
//! parent links and frames; hit testing returns the most recently exposed
//! element whose frame contains the point, and by default that element is
//! also the natural recipient of scroll input. `RecordingInjector` keeps every
//! posted event.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use topscroll_lib::config::ScrollConfig;
use topscroll_lib::error::{LookupFailure, TopscrollError};
use topscroll_lib::routing::{
    AccessibilityTree, DeviceClass, ElementCapabilities, EventInjector, Point, Rect, ScrollController,
    ScrollEvent, ScrollPhase, SourceTag,
};

pub const SCREEN: Rect = Rect::new(0.0, 0.0, 1440.0, 900.0);

/// Tag stamped by [`RecordingInjector`].
pub const TEST_TAG: SourceTag = SourceTag(0x5445_5354);

pub type TestController = ScrollController<MemoryTree, RecordingInjector>;

// ============================================================================
// MemoryTree
// ============================================================================

#[derive(Clone)]
struct Element {
    parent: Option<u32>,
    capabilities: ElementCapabilities,
}

/// Who receives scroll input when nothing is rerouted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NaturalRecipient {
    /// The element under the event location.
    UnderPointer,
    /// A fixed element; `None` means unknown.
    Fixed(Option<u32>),
}

pub struct MemoryTree {
    elements: Mutex<HashMap<u32, Element>>,
    hit_regions: Mutex<Vec<(Rect, u32)>>,
    natural: Mutex<NaturalRecipient>,
    trusted: AtomicBool,
    api_disabled: AtomicBool,
    queries: AtomicUsize,
    trust_checks: AtomicUsize,
    roots: AtomicUsize,
}

impl Default for MemoryTree {
    fn default() -> Self { Self::new() }
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            elements: Mutex::new(HashMap::new()),
            hit_regions: Mutex::new(Vec::new()),
            natural: Mutex::new(NaturalRecipient::UnderPointer),
            trusted: AtomicBool::new(true),
            api_disabled: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
            trust_checks: AtomicUsize::new(0),
            roots: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, id: u32, parent: Option<u32>, role: &str, scrollable: bool, frame: Rect) {
        let capabilities = ElementCapabilities {
            scrollable,
            frame: Some(frame),
            role: Some(role.to_string()),
        };
        self.elements.lock().insert(id, Element { parent, capabilities });
    }

    /// Makes `id` the hit-test result inside its frame.
    pub fn expose(&self, id: u32) {
        let frame = self.elements.lock().get(&id).and_then(|e| e.capabilities.frame);
        if let Some(frame) = frame {
            self.hit_regions.lock().push((frame, id));
        }
    }

    /// Pins the element the OS would deliver scroll input to.
    pub fn set_default_target(&self, id: Option<u32>) {
        *self.natural.lock() = NaturalRecipient::Fixed(id);
    }

    /// The element hit testing returns at `point`, without counting a query.
    pub fn hit(&self, point: Point) -> Option<u32> {
        self.hit_regions.lock().iter().rev().find(|(frame, _)| frame.contains(point)).map(|(_, id)| *id)
    }

    /// The nearest scrollable element above whatever is hit at `point`.
    pub fn scroll_owner_at(&self, point: Point) -> Option<u32> {
        let elements = self.elements.lock();
        let mut current = self.hit(point);
        while let Some(id) = current {
            let element = elements.get(&id)?;
            if element.capabilities.scrollable {
                return Some(id);
            }
            current = element.parent;
        }
        None
    }

    /// Simulates the user toggling the accessibility permission.
    ///
    /// Revocation is seen both by the trust check and by live queries.
    pub fn set_permission(&self, granted: bool) {
        self.trusted.store(granted, Ordering::SeqCst);
        self.api_disabled.store(!granted, Ordering::SeqCst);
    }

    /// Number of element and root queries made so far. Trust checks are not included.
    pub fn queries(&self) -> usize { self.queries.load(Ordering::SeqCst) }

    pub fn trust_checks(&self) -> usize { self.trust_checks.load(Ordering::SeqCst) }

    pub fn roots_created(&self) -> usize { self.roots.load(Ordering::SeqCst) }

    fn enter(&self) -> Result<(), TopscrollError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.api_disabled.load(Ordering::SeqCst) {
            return Err(TopscrollError::PermissionDenied);
        }
        Ok(())
    }

    fn element(&self, id: u32) -> Result<Element, TopscrollError> {
        self.elements.lock().get(&id).cloned().ok_or(TopscrollError::StaleHandle)
    }
}

impl AccessibilityTree for MemoryTree {
    type Root = usize;
    type Element = u32;

    fn is_process_trusted(&self) -> bool {
        self.trust_checks.fetch_add(1, Ordering::SeqCst);
        self.trusted.load(Ordering::SeqCst)
    }

    fn create_root(&self) -> Result<usize, TopscrollError> {
        self.enter()?;
        Ok(self.roots.fetch_add(1, Ordering::SeqCst))
    }

    fn element_at(&self, _root: &usize, position: Point) -> Result<u32, TopscrollError> {
        self.enter()?;
        self.hit(position)
            .ok_or_else(|| LookupFailure::Query("nothing under the pointer".to_string()).into())
    }

    fn capabilities(&self, element: &u32) -> Result<ElementCapabilities, TopscrollError> {
        self.enter()?;
        Ok(self.element(*element)?.capabilities)
    }

    fn parent(&self, element: &u32) -> Result<Option<u32>, TopscrollError> {
        self.enter()?;
        Ok(self.element(*element)?.parent)
    }

    fn natural_target(
        &self,
        _root: &usize,
        _event: &ScrollEvent,
        hit: &u32,
    ) -> Result<Option<u32>, TopscrollError> {
        self.enter()?;
        Ok(match *self.natural.lock() {
            NaturalRecipient::UnderPointer => Some(*hit),
            NaturalRecipient::Fixed(id) => id,
        })
    }
}

// ============================================================================
// RecordingInjector
// ============================================================================

#[derive(Default)]
pub struct RecordingInjector {
    posted: Mutex<Vec<ScrollEvent>>,
    rejecting: AtomicBool,
}

impl RecordingInjector {
    pub fn posted(&self) -> Vec<ScrollEvent> { self.posted.lock().clone() }

    pub fn reject_posts(&self, reject: bool) { self.rejecting.store(reject, Ordering::SeqCst); }
}

impl EventInjector for RecordingInjector {
    type Source = SourceTag;

    fn create_source(&self) -> Result<SourceTag, TopscrollError> { Ok(TEST_TAG) }

    fn source_tag(&self, source: &SourceTag) -> SourceTag { *source }

    fn post(&self, _source: &SourceTag, event: &ScrollEvent) -> Result<(), TopscrollError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(TopscrollError::InjectionFailed("session tap rejected the event".to_string()));
        }
        self.posted.lock().push(*event);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Ids used by [`browser_window`].
pub mod ids {
    pub const WINDOW: u32 = 1;
    pub const SIDEBAR: u32 = 2;
    pub const CONTENT_SCROLL: u32 = 10;
    pub const CONTENT_GROUP: u32 = 11;
    pub const LINK: u32 = 12;
    pub const SIDEBAR_LIST: u32 = 20;
}

/// Frame of the main content scroll area.
pub const CONTENT: Rect = Rect::new(300.0, 60.0, 1100.0, 800.0);

/// Frame of the sidebar scroll area.
pub const SIDEBAR: Rect = Rect::new(0.0, 60.0, 300.0, 800.0);

/// Frame of the link inside the content area.
pub const LINK: Rect = Rect::new(500.0, 200.0, 120.0, 20.0);

/// A window with a scrollable sidebar and a scrollable content area.
///
/// ```text
/// window (AXWindow)
/// ├─ sidebar (AXScrollArea)                        ← exposed
/// │  └─ sidebar list (AXList, top half)            ← exposed
/// └─ content (AXScrollArea)
///    └─ group (AXGroup)                            ← exposed
///       └─ link (AXLink)                           ← exposed
/// ```
///
/// The link is two hops below the content scroll area. Scroll input goes to
/// the element under the pointer unless [`MemoryTree::set_default_target`]
/// pins it.
pub fn browser_window() -> MemoryTree {
    let tree = MemoryTree::new();
    tree.insert(ids::WINDOW, None, "AXWindow", false, SCREEN);
    tree.insert(ids::SIDEBAR, Some(ids::WINDOW), "AXScrollArea", true, SIDEBAR);
    tree.insert(ids::SIDEBAR_LIST, Some(ids::SIDEBAR), "AXList", false, Rect::new(0.0, 60.0, 300.0, 400.0));
    tree.insert(ids::CONTENT_SCROLL, Some(ids::WINDOW), "AXScrollArea", true, CONTENT);
    tree.insert(ids::CONTENT_GROUP, Some(ids::CONTENT_SCROLL), "AXGroup", false, CONTENT);
    tree.insert(ids::LINK, Some(ids::CONTENT_GROUP), "AXLink", false, LINK);
    tree.expose(ids::SIDEBAR);
    tree.expose(ids::SIDEBAR_LIST);
    tree.expose(ids::CONTENT_GROUP);
    tree.expose(ids::LINK);
    tree
}

pub fn controller(tree: MemoryTree) -> TestController {
    controller_with(tree, ScrollConfig::default())
}

pub fn controller_with(tree: MemoryTree, config: ScrollConfig) -> TestController {
    ScrollController::new(tree, RecordingInjector::default(), config)
}

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// A wheel event at `(x, y)` with a timestamp far from any previous event,
/// so the lookup cache never answers for it.
pub fn wheel_at(x: f64, y: f64) -> ScrollEvent {
    ScrollEvent::new(Point::new(x, y), 0.0, -3.0, DeviceClass::Wheel).with_timestamp(next_timestamp())
}

/// A trackpad event at `(x, y)` in the given phase.
pub fn trackpad_at(x: f64, y: f64, phase: ScrollPhase) -> ScrollEvent {
    ScrollEvent::new(Point::new(x, y), 0.0, -12.5, DeviceClass::Trackpad)
        .with_phase(phase)
        .with_timestamp(next_timestamp())
}

fn next_timestamp() -> u64 {
    let step = u64::try_from(Duration::from_secs(1).as_nanos()).unwrap_or(u64::MAX);
    CLOCK.fetch_add(step, Ordering::SeqCst)
}

/// A point on the link, two hops below the content scroll area.
pub const OVER_LINK: (f64, f64) = (520.0, 210.0);

/// A point on the sidebar scroll area itself, below its list.
pub const OVER_SIDEBAR: (f64, f64) = (100.0, 700.0);

/// A point on the content group, one hop below the content scroll area.
pub const OVER_CONTENT_GROUP: (f64, f64) = (900.0, 600.0);
