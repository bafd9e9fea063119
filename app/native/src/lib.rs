//! Topscroll - scroll whatever is under the pointer.
//!
//! Intercepts scroll-wheel and trackpad events, finds the nearest scrollable
//! accessibility element under the pointer, and re-posts the event there when
//! the system would have delivered it somewhere else.
//!
//! The routing engine in [`routing`] is platform independent; the macOS
//! accessibility, event tap and notification plumbing lives in [`platform`].

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod platform;
pub mod routing;
pub mod schema;
