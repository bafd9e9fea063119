//! Error types for Topscroll.
//!
//! This module provides the unified error type used throughout the crate. The
//! routing variants mirror how each failure is resolved: none of them is fatal,
//! and every one of them degrades to "leave this event alone".

use serde::Serialize;
use thiserror::Error;

/// Why an element lookup did not produce a target.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", content = "detail")]
pub enum LookupFailure {
    /// The nearest scrollable ancestor is further away than the hop limit.
    #[error("no scrollable element within {limit} hops")]
    HopLimitExceeded { limit: usize },
    /// The walk reached the top of the tree without finding a scrollable element.
    #[error("no scrollable ancestor")]
    NoScrollableAncestor,
    /// No point inside the target hit-tests to it rather than to the natural recipient.
    #[error("no point inside the target reaches it")]
    NoDeliveryPoint,
    /// The accessibility layer panicked while answering a query.
    #[error("accessibility query panicked")]
    QueryPanicked,
    /// The accessibility layer returned an error.
    #[error("{0}")]
    Query(String),
}

/// Errors that can occur during Topscroll execution.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum TopscrollError {
    /// Accessibility authorization is missing or was revoked.
    #[error("Accessibility permission denied")]
    PermissionDenied,
    /// A handle belongs to an epoch that has since been reset.
    #[error("Stale handle from a previous epoch")]
    StaleHandle,
    /// Element lookup failed or exceeded its bound.
    #[error("Lookup failed: {0}")]
    LookupFailed(LookupFailure),
    /// A rerouted event could not be delivered.
    #[error("Injection failed: {0}")]
    InjectionFailed(String),
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// A native platform call failed outside the per-event path.
    #[error("Platform error: {0}")]
    PlatformError(String),
    /// The requested operation needs macOS.
    #[error("Unsupported platform: {0} requires macOS")]
    UnsupportedPlatform(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
}

impl TopscrollError {
    /// Returns whether the error should be surfaced to the user.
    ///
    /// Only missing accessibility authorization is actionable by the user;
    /// everything else is recovered locally.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool { matches!(self, Self::PermissionDenied) }
}

impl From<LookupFailure> for TopscrollError {
    fn from(failure: LookupFailure) -> Self { Self::LookupFailed(failure) }
}

impl From<std::io::Error> for TopscrollError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for TopscrollError {
    fn from(err: serde_json::Error) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<crate::config::ConfigError> for TopscrollError {
    fn from(err: crate::config::ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}
