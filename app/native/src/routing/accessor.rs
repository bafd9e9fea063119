//! Abstract accessors for the two native collaborators of the routing engine.
//!
//! The decision engine never talks to the OS directly. It queries an
//! [`AccessibilityTree`] for element geometry and capabilities, and hands
//! rerouted events to an [`EventInjector`]. The macOS implementations live in
//! `crate::platform::macos`; tests use in-memory fakes.

use std::fmt::Debug;

use crate::error::TopscrollError;
use crate::routing::types::{ElementCapabilities, Point, ScrollEvent, SourceTag};

/// Read-only view of the live accessibility tree.
///
/// Every query may fail. Implementations report missing authorization as
/// [`TopscrollError::PermissionDenied`], invalidated handles as
/// [`TopscrollError::StaleHandle`], and anything else as
/// [`TopscrollError::LookupFailed`].
pub trait AccessibilityTree: Send + Sync {
    /// System-wide entry point for position queries.
    type Root: Send + Sync;
    /// Opaque element handle. Equality means "same UI element".
    type Element: Clone + PartialEq + Debug + Send + Sync;

    /// Returns whether the process is currently authorized to use accessibility.
    fn is_process_trusted(&self) -> bool;

    /// Creates the system-wide root handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be created.
    fn create_root(&self) -> Result<Self::Root, TopscrollError>;

    /// Returns the deepest element at the given screen position.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or nothing is under the point.
    fn element_at(&self, root: &Self::Root, position: Point) -> Result<Self::Element, TopscrollError>;

    /// Returns the capabilities of an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot be queried.
    fn capabilities(&self, element: &Self::Element) -> Result<ElementCapabilities, TopscrollError>;

    /// Returns the parent of an element, or `None` at the top of the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot be queried.
    fn parent(&self, element: &Self::Element) -> Result<Option<Self::Element>, TopscrollError>;

    /// Returns the element that would receive `event` under default OS routing.
    ///
    /// `hit` is the element [`element_at`](Self::element_at) returned for the
    /// event location. Platforms that route scroll input by location answer
    /// with it directly. `Ok(None)` means the default recipient is unknown;
    /// the engine then treats any discovered scrollable target as different.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn natural_target(
        &self,
        root: &Self::Root,
        event: &ScrollEvent,
        hit: &Self::Element,
    ) -> Result<Option<Self::Element>, TopscrollError>;
}

/// Sink for rerouted events.
pub trait EventInjector: Send + Sync {
    /// Event source identity used to stamp synthetic events.
    type Source: Send + Sync;

    /// Creates a new event source.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the source.
    fn create_source(&self) -> Result<Self::Source, TopscrollError>;

    /// Returns the tag that events posted through `source` will carry.
    fn source_tag(&self, source: &Self::Source) -> SourceTag;

    /// Posts a synthetic event into the system input stream.
    ///
    /// # Errors
    ///
    /// Returns [`TopscrollError::InjectionFailed`] if the event could not be posted.
    fn post(&self, source: &Self::Source, event: &ScrollEvent) -> Result<(), TopscrollError>;
}
