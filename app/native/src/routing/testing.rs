//! In-memory accessibility tree and injector used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{LookupFailure, TopscrollError};
use crate::routing::accessor::{AccessibilityTree, EventInjector};
use crate::routing::types::{ElementCapabilities, Point, Rect, ScrollEvent, SourceTag};

#[derive(Clone)]
struct Node {
    parent: Option<u32>,
    capabilities: ElementCapabilities,
}

/// Fake tree: elements are `u32` ids, hit testing picks the last region added.
pub struct FakeTree {
    nodes: Mutex<HashMap<u32, Node>>,
    regions: Mutex<Vec<(Rect, u32)>>,
    natural: Mutex<Option<u32>>,
    trusted: AtomicBool,
    api_disabled: AtomicBool,
    failing: AtomicBool,
    panicking: AtomicBool,
    stale_root: AtomicBool,
    calls: AtomicUsize,
    trust_checks: AtomicUsize,
    roots_created: AtomicUsize,
}

impl FakeTree {
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            regions: Mutex::new(Vec::new()),
            natural: Mutex::new(None),
            trusted: AtomicBool::new(true),
            api_disabled: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            panicking: AtomicBool::new(false),
            stale_root: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            trust_checks: AtomicUsize::new(0),
            roots_created: AtomicUsize::new(0),
        }
    }

    /// Adds an element with the given parent.
    pub fn add(&self, id: u32, parent: Option<u32>, scrollable: bool, frame: Rect) {
        let capabilities = ElementCapabilities {
            scrollable,
            frame: Some(frame),
            role: Some(if scrollable { "AXScrollArea" } else { "AXGroup" }.to_string()),
        };
        self.nodes.lock().insert(id, Node { parent, capabilities });
    }

    /// Makes `id` the hit-test result for points inside its frame.
    pub fn expose(&self, id: u32) {
        let frame = self.nodes.lock().get(&id).and_then(|n| n.capabilities.frame);
        if let Some(frame) = frame {
            self.regions.lock().push((frame, id));
        }
    }

    /// Builds a straight chain `ids[0]` (leaf) → … → `ids[n-1]` (top), all sharing `frame`.
    ///
    /// Only ids listed in `scrollable` are scrollable. The leaf is exposed.
    pub fn chain(&self, ids: &[u32], scrollable: &[u32], frame: Rect) {
        for (index, id) in ids.iter().enumerate() {
            let parent = ids.get(index + 1).copied();
            self.add(*id, parent, scrollable.contains(id), frame);
        }
        if let Some(leaf) = ids.first() {
            self.expose(*leaf);
        }
    }

    /// Fixes the natural recipient regardless of the hit element. `None` means unknown.
    pub fn set_natural_target(&self, id: Option<u32>) { *self.natural.lock() = id; }

    pub fn set_trusted(&self, trusted: bool) { self.trusted.store(trusted, Ordering::SeqCst); }

    pub fn set_api_disabled(&self, disabled: bool) {
        self.api_disabled.store(disabled, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst); }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Makes the next hit test report the root handle as invalid.
    pub fn invalidate_root_once(&self) { self.stale_root.store(true, Ordering::SeqCst); }

    /// Number of element and root queries. Trust checks are counted separately.
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn trust_checks(&self) -> usize { self.trust_checks.load(Ordering::SeqCst) }

    pub fn roots_created(&self) -> usize { self.roots_created.load(Ordering::SeqCst) }

    fn enter(&self) -> Result<(), TopscrollError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panicking.load(Ordering::SeqCst), "accessibility layer crashed");
        if self.api_disabled.load(Ordering::SeqCst) {
            return Err(TopscrollError::PermissionDenied);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(LookupFailure::Query("cannot complete".to_string()).into());
        }
        Ok(())
    }

    fn node(&self, id: u32) -> Result<Node, TopscrollError> {
        self.nodes.lock().get(&id).cloned().ok_or(TopscrollError::StaleHandle)
    }
}

impl AccessibilityTree for FakeTree {
    type Root = usize;
    type Element = u32;

    fn is_process_trusted(&self) -> bool {
        self.trust_checks.fetch_add(1, Ordering::SeqCst);
        self.trusted.load(Ordering::SeqCst)
    }

    fn create_root(&self) -> Result<usize, TopscrollError> {
        self.enter()?;
        Ok(self.roots_created.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn element_at(&self, _root: &usize, position: Point) -> Result<u32, TopscrollError> {
        self.enter()?;
        if self.stale_root.swap(false, Ordering::SeqCst) {
            return Err(TopscrollError::StaleHandle);
        }
        self.regions
            .lock()
            .iter()
            .rev()
            .find(|(frame, _)| frame.contains(position))
            .map(|(_, id)| *id)
            .ok_or_else(|| LookupFailure::Query("no element at position".to_string()).into())
    }

    fn capabilities(&self, element: &u32) -> Result<ElementCapabilities, TopscrollError> {
        self.enter()?;
        Ok(self.node(*element)?.capabilities)
    }

    fn parent(&self, element: &u32) -> Result<Option<u32>, TopscrollError> {
        self.enter()?;
        Ok(self.node(*element)?.parent)
    }

    fn natural_target(
        &self,
        _root: &usize,
        _event: &ScrollEvent,
        _hit: &u32,
    ) -> Result<Option<u32>, TopscrollError> {
        self.enter()?;
        Ok(*self.natural.lock())
    }
}

/// Fake injector recording posted events.
pub struct FakeInjector {
    posted: Mutex<Vec<ScrollEvent>>,
    fail_post: AtomicBool,
    fail_source: AtomicBool,
    sources_created: AtomicUsize,
}

impl FakeInjector {
    pub const TAG_BASE: i64 = 0x7073_0000;

    pub fn new() -> Self {
        Self {
            posted: Mutex::new(Vec::new()),
            fail_post: AtomicBool::new(false),
            fail_source: AtomicBool::new(false),
            sources_created: AtomicUsize::new(0),
        }
    }

    pub fn fail_posts(&self, fail: bool) { self.fail_post.store(fail, Ordering::SeqCst); }

    pub fn fail_source_creation(&self, fail: bool) {
        self.fail_source.store(fail, Ordering::SeqCst);
    }

    pub fn sources_created(&self) -> usize { self.sources_created.load(Ordering::SeqCst) }

    pub fn posted(&self) -> Vec<ScrollEvent> { self.posted.lock().clone() }
}

impl EventInjector for FakeInjector {
    type Source = SourceTag;

    fn create_source(&self) -> Result<SourceTag, TopscrollError> {
        if self.fail_source.load(Ordering::SeqCst) {
            return Err(TopscrollError::PlatformError("no event source".to_string()));
        }
        self.sources_created.fetch_add(1, Ordering::SeqCst);
        Ok(SourceTag(Self::TAG_BASE))
    }

    fn source_tag(&self, source: &SourceTag) -> SourceTag { *source }

    fn post(&self, _source: &SourceTag, event: &ScrollEvent) -> Result<(), TopscrollError> {
        if self.fail_post.load(Ordering::SeqCst) {
            return Err(TopscrollError::InjectionFailed("post rejected".to_string()));
        }
        self.posted.lock().push(*event);
        Ok(())
    }
}
