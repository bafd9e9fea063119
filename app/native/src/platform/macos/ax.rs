//! Accessibility tree access through `AXUIElement`.
//!
//! [`MacTree`] implements [`AccessibilityTree`] on top of the system-wide
//! accessibility element. [`AXElement`] wraps an `AXUIElementRef` with
//! automatic memory management.
//!
//! # Thread Safety
//!
//! The Accessibility API is thread-safe for operations on different elements,
//! so `AXElement` implements `Send` and `Sync`. The cached attribute names are
//! thread-local because `CFString` is not `Sync`.

use std::cell::OnceCell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use core_foundation::base::TCFType;
use core_foundation::string::CFString;
use core_graphics::geometry::{CGPoint, CGSize};

use super::permissions;
use crate::error::{LookupFailure, TopscrollError};
use crate::routing::{AccessibilityTree, ElementCapabilities, Point, Rect, ScrollEvent};

// ============================================================================
// FFI Declarations
// ============================================================================

type AXUIElementRef = *mut c_void;
type AXError = i32;

const K_AX_ERROR_SUCCESS: AXError = 0;
const K_AX_ERROR_INVALID_UI_ELEMENT: AXError = -25202;
const K_AX_ERROR_CANNOT_COMPLETE: AXError = -25204;
const K_AX_ERROR_ATTRIBUTE_UNSUPPORTED: AXError = -25205;
const K_AX_ERROR_NOT_IMPLEMENTED: AXError = -25208;
const K_AX_ERROR_API_DISABLED: AXError = -25211;
const K_AX_ERROR_NO_VALUE: AXError = -25212;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXUIElementCreateSystemWide() -> AXUIElementRef;
    fn AXUIElementCopyElementAtPosition(
        application: AXUIElementRef,
        x: f32,
        y: f32,
        element: *mut AXUIElementRef,
    ) -> AXError;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: *const c_void,
        value: *mut *mut c_void,
    ) -> AXError;
    fn AXUIElementSetMessagingTimeout(element: AXUIElementRef, timeout_seconds: f32) -> AXError;
    fn AXUIElementGetTypeID() -> u64;
    fn AXValueGetValue(value: *const c_void, value_type: i32, value_ptr: *mut c_void) -> bool;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFGetTypeID(cf: *const c_void) -> u64;
    fn CFEqual(cf1: *const c_void, cf2: *const c_void) -> bool;
    fn CFRelease(cf: *const c_void);
    fn CFRetain(cf: *const c_void) -> *const c_void;
}

// AXValue type constants
const K_AX_VALUE_TYPE_CG_POINT: i32 = 1;
const K_AX_VALUE_TYPE_CG_SIZE: i32 = 2;

/// Role of native scroll containers.
pub const SCROLL_AREA_ROLE: &str = "AXScrollArea";

// ============================================================================
// Cached CFStrings
// ============================================================================

thread_local! {
    static CF_ROLE: OnceCell<CFString> = const { OnceCell::new() };
    static CF_PARENT: OnceCell<CFString> = const { OnceCell::new() };
    static CF_POSITION: OnceCell<CFString> = const { OnceCell::new() };
    static CF_SIZE: OnceCell<CFString> = const { OnceCell::new() };
    static CF_VERTICAL_SCROLL_BAR: OnceCell<CFString> = const { OnceCell::new() };
    static CF_HORIZONTAL_SCROLL_BAR: OnceCell<CFString> = const { OnceCell::new() };
}

/// Gets or creates a cached `CFString`.
macro_rules! cached_cfstring {
    ($cell:expr, $value:expr) => {
        $cell.with(|cell| cell.get_or_init(|| CFString::new($value)).as_concrete_TypeRef().cast())
    };
}

#[inline]
fn cf_role() -> *const c_void { cached_cfstring!(CF_ROLE, "AXRole") }

#[inline]
fn cf_parent() -> *const c_void { cached_cfstring!(CF_PARENT, "AXParent") }

#[inline]
fn cf_position() -> *const c_void { cached_cfstring!(CF_POSITION, "AXPosition") }

#[inline]
fn cf_size() -> *const c_void { cached_cfstring!(CF_SIZE, "AXSize") }

#[inline]
fn cf_vertical_scroll_bar() -> *const c_void {
    cached_cfstring!(CF_VERTICAL_SCROLL_BAR, "AXVerticalScrollBar")
}

#[inline]
fn cf_horizontal_scroll_bar() -> *const c_void {
    cached_cfstring!(CF_HORIZONTAL_SCROLL_BAR, "AXHorizontalScrollBar")
}

// ============================================================================
// AXElement
// ============================================================================

/// A safe wrapper around `AXUIElementRef`.
pub struct AXElement {
    /// Never null for a valid `AXElement`.
    raw: AXUIElementRef,
}

impl AXElement {
    /// Creates the system-wide element.
    #[must_use]
    pub fn system_wide() -> Option<Self> {
        // SAFETY: returns a +1 reference or null.
        unsafe { Self::from_raw(AXUIElementCreateSystemWide()) }
    }

    /// Creates an `AXElement` from a raw pointer, taking ownership.
    ///
    /// # Safety
    ///
    /// The pointer must be a valid `AXUIElementRef` (or null) whose ownership
    /// is transferred to the returned value.
    #[must_use]
    pub const unsafe fn from_raw(raw: AXUIElementRef) -> Option<Self> {
        if raw.is_null() { None } else { Some(Self { raw }) }
    }

    /// Returns the raw `AXUIElementRef` without transferring ownership.
    #[must_use]
    pub const fn as_raw(&self) -> AXUIElementRef { self.raw }

    /// Gets the element's role.
    #[must_use]
    pub fn role(&self) -> Option<String> {
        copy_string_attr(self.raw, cf_role(), "role").ok().flatten()
    }
}

impl Drop for AXElement {
    fn drop(&mut self) {
        // SAFETY: self.raw is guaranteed to be valid and non-null
        unsafe { CFRelease(self.raw.cast()) };
    }
}

impl Clone for AXElement {
    fn clone(&self) -> Self {
        // SAFETY: self.raw is guaranteed to be valid and non-null
        unsafe { CFRetain(self.raw.cast()) };
        Self { raw: self.raw }
    }
}

impl PartialEq for AXElement {
    fn eq(&self, other: &Self) -> bool {
        // SAFETY: both pointers are valid and non-null
        self.raw == other.raw || unsafe { CFEqual(self.raw.cast(), other.raw.cast()) }
    }
}

// SAFETY: The Accessibility API is thread-safe for operations on different elements.
unsafe impl Send for AXElement {}
unsafe impl Sync for AXElement {}

impl std::fmt::Debug for AXElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AXElement").field("raw", &self.raw).finish()
    }
}

// ============================================================================
// MacTree
// ============================================================================

/// [`AccessibilityTree`] backed by the live macOS accessibility hierarchy.
#[derive(Debug)]
pub struct MacTree {
    /// Messaging timeout in seconds, stored as `f32` bits.
    timeout_bits: AtomicU32,
}

impl MacTree {
    /// Creates a tree whose roots use the given messaging timeout.
    #[must_use]
    pub fn new(timeout_secs: f32) -> Self { Self { timeout_bits: AtomicU32::new(timeout_secs.to_bits()) } }

    /// Sets the messaging timeout applied to roots created from now on.
    pub fn set_messaging_timeout(&self, timeout_secs: f32) {
        self.timeout_bits.store(timeout_secs.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn messaging_timeout(&self) -> f32 { f32::from_bits(self.timeout_bits.load(Ordering::Relaxed)) }
}

impl AccessibilityTree for MacTree {
    type Root = AXElement;
    type Element = AXElement;

    fn is_process_trusted(&self) -> bool { permissions::is_trusted() }

    fn create_root(&self) -> Result<AXElement, TopscrollError> {
        let root = AXElement::system_wide().ok_or_else(|| {
            TopscrollError::PlatformError("AXUIElementCreateSystemWide returned null".to_string())
        })?;

        // A zero timeout would block on unresponsive applications.
        let result = unsafe { AXUIElementSetMessagingTimeout(root.raw, self.messaging_timeout()) };
        if result != K_AX_ERROR_SUCCESS {
            tracing::debug!(error = result, "failed to set accessibility messaging timeout");
        }
        Ok(root)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn element_at(&self, root: &AXElement, position: Point) -> Result<AXElement, TopscrollError> {
        let mut value: AXUIElementRef = ptr::null_mut();
        let result = unsafe {
            AXUIElementCopyElementAtPosition(
                root.raw,
                position.x as f32,
                position.y as f32,
                &raw mut value,
            )
        };

        match result {
            K_AX_ERROR_SUCCESS => unsafe { AXElement::from_raw(value) }.ok_or_else(|| {
                TopscrollError::LookupFailed(LookupFailure::Query("no element at position".to_string()))
            }),
            // On the system-wide element this means the handle itself is dead.
            K_AX_ERROR_INVALID_UI_ELEMENT => Err(TopscrollError::StaleHandle),
            code => Err(ax_error(code, "element at position")),
        }
    }

    fn capabilities(&self, element: &AXElement) -> Result<ElementCapabilities, TopscrollError> {
        let role = copy_string_attr(element.raw, cf_role(), "role")?;
        let scrollable = role.as_deref() == Some(SCROLL_AREA_ROLE)
            || has_attr(element.raw, cf_vertical_scroll_bar(), "vertical scroll bar")?
            || has_attr(element.raw, cf_horizontal_scroll_bar(), "horizontal scroll bar")?;

        let frame = match (copy_point_attr(element.raw)?, copy_size_attr(element.raw)?) {
            (Some(origin), Some(size)) => Some(Rect::new(origin.x, origin.y, size.width, size.height)),
            _ => None,
        };

        Ok(ElementCapabilities { scrollable, frame, role })
    }

    fn parent(&self, element: &AXElement) -> Result<Option<AXElement>, TopscrollError> {
        copy_element_attr(element.raw, cf_parent(), "parent")
    }

    /// AppKit hands scroll-wheel events to the view under the event location,
    /// whatever window or element holds keyboard focus.
    fn natural_target(
        &self,
        _root: &AXElement,
        _event: &ScrollEvent,
        hit: &AXElement,
    ) -> Result<Option<AXElement>, TopscrollError> {
        Ok(Some(hit.clone()))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// An owned CF object returned by a `Copy` function.
struct CfValue(*mut c_void);

impl Drop for CfValue {
    fn drop(&mut self) {
        // SAFETY: only constructed from non-null +1 references.
        unsafe { CFRelease(self.0.cast()) };
    }
}

/// Copies an attribute value. Missing or unsupported attributes are `Ok(None)`.
fn copy_attr(
    element: AXUIElementRef,
    attr: *const c_void,
    operation: &str,
) -> Result<Option<CfValue>, TopscrollError> {
    let mut value: *mut c_void = ptr::null_mut();
    let result = unsafe { AXUIElementCopyAttributeValue(element, attr, &raw mut value) };

    match result {
        K_AX_ERROR_SUCCESS if value.is_null() => Ok(None),
        K_AX_ERROR_SUCCESS => Ok(Some(CfValue(value))),
        K_AX_ERROR_NO_VALUE | K_AX_ERROR_ATTRIBUTE_UNSUPPORTED => Ok(None),
        code => Err(ax_error(code, operation)),
    }
}

fn has_attr(element: AXUIElementRef, attr: *const c_void, operation: &str) -> Result<bool, TopscrollError> {
    Ok(copy_attr(element, attr, operation)?.is_some())
}

fn copy_string_attr(
    element: AXUIElementRef,
    attr: *const c_void,
    operation: &str,
) -> Result<Option<String>, TopscrollError> {
    let Some(value) = copy_attr(element, attr, operation)? else {
        return Ok(None);
    };

    let cf_string_type_id = CFString::type_id() as u64;
    if unsafe { CFGetTypeID(value.0) } != cf_string_type_id {
        return Ok(None);
    }

    let cf_string = unsafe { CFString::wrap_under_get_rule(value.0.cast()) };
    Ok(Some(cf_string.to_string()))
}

fn copy_element_attr(
    element: AXUIElementRef,
    attr: *const c_void,
    operation: &str,
) -> Result<Option<AXElement>, TopscrollError> {
    let Some(value) = copy_attr(element, attr, operation)? else {
        return Ok(None);
    };

    if unsafe { CFGetTypeID(value.0) != AXUIElementGetTypeID() } {
        return Ok(None);
    }

    // Hand the +1 reference over to the element wrapper.
    let raw = value.0;
    std::mem::forget(value);
    Ok(unsafe { AXElement::from_raw(raw) })
}

fn copy_point_attr(element: AXUIElementRef) -> Result<Option<CGPoint>, TopscrollError> {
    let Some(value) = copy_attr(element, cf_position(), "position")? else {
        return Ok(None);
    };

    let mut point = CGPoint::new(0.0, 0.0);
    let success =
        unsafe { AXValueGetValue(value.0, K_AX_VALUE_TYPE_CG_POINT, (&raw mut point).cast()) };
    Ok(success.then_some(point))
}

fn copy_size_attr(element: AXUIElementRef) -> Result<Option<CGSize>, TopscrollError> {
    let Some(value) = copy_attr(element, cf_size(), "size")? else {
        return Ok(None);
    };

    let mut size = CGSize::new(0.0, 0.0);
    let success =
        unsafe { AXValueGetValue(value.0, K_AX_VALUE_TYPE_CG_SIZE, (&raw mut size).cast()) };
    Ok(success.then_some(size))
}

/// Maps an `AXError` to the routing error taxonomy.
fn ax_error(result: AXError, operation: &str) -> TopscrollError {
    let message = match result {
        K_AX_ERROR_API_DISABLED => return TopscrollError::PermissionDenied,
        K_AX_ERROR_INVALID_UI_ELEMENT => "Invalid UI element",
        K_AX_ERROR_ATTRIBUTE_UNSUPPORTED => "Attribute unsupported",
        K_AX_ERROR_NOT_IMPLEMENTED => "Not implemented",
        K_AX_ERROR_CANNOT_COMPLETE => "Cannot complete operation",
        K_AX_ERROR_NO_VALUE => "No value",
        _ => "Unknown error",
    };
    TopscrollError::LookupFailed(LookupFailure::Query(format!(
        "{operation}: {message} (error {result})"
    )))
}
