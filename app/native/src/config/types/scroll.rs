//! Scroll routing configuration types.
//!
//! The preferences snapshot read by the decision engine on every event.

use std::ops::RangeInclusive;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::root::ConfigError;
use crate::routing::DeviceClass;

/// Default maximum number of parent hops during element lookup.
const DEFAULT_HOP_LIMIT: usize = 8;

/// Default accessibility messaging timeout in milliseconds.
const DEFAULT_ACCESSIBILITY_TIMEOUT_MS: u64 = 50;

/// Default lifetime of the single-slot lookup cache in milliseconds.
const DEFAULT_LOOKUP_CACHE_TTL_MS: u64 = 120;

/// Largest accepted `hopLimit`. Deeper walks are rejected rather than shortened.
pub const MAX_HOP_LIMIT: usize = 64;

/// Accepted range for `accessibilityTimeoutMs`.
const ACCESSIBILITY_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=1000;

/// Configuration for scroll rerouting.
///
/// Scroll events are redirected to the nearest scrollable element under the
/// pointer when the OS would have delivered them somewhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrollConfig {
    /// Whether scroll rerouting is enabled.
    /// Default: true
    pub enabled: bool,

    /// Device classes whose events are considered for rerouting.
    /// - `wheel`: line-based mouse wheels
    /// - `trackpad`: trackpads and other continuous devices
    ///
    /// Default: ["wheel", "trackpad"]
    pub device_filter: Vec<DeviceClass>,

    /// Maximum number of parent hops when searching for a scrollable element.
    /// 0 means only the element under the pointer itself qualifies.
    /// Values above 64 are rejected.
    /// Default: 8
    pub hop_limit: usize,

    /// Timeout in milliseconds for a single accessibility query.
    /// Clamped to 1..=1000.
    /// Default: 50
    pub accessibility_timeout_ms: u64,

    /// How long a lookup result is reused for events at the same pixel.
    /// Set to 0 to disable the cache.
    /// Default: 120
    pub lookup_cache_ttl_ms: u64,

    /// Drop momentum events of a rerouted gesture when the environment
    /// changed while the gesture was in flight.
    /// Default: true
    pub suppress_stale_momentum: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_filter: vec![DeviceClass::Wheel, DeviceClass::Trackpad],
            hop_limit: DEFAULT_HOP_LIMIT,
            accessibility_timeout_ms: DEFAULT_ACCESSIBILITY_TIMEOUT_MS,
            lookup_cache_ttl_ms: DEFAULT_LOOKUP_CACHE_TTL_MS,
            suppress_stale_momentum: true,
        }
    }
}

impl ScrollConfig {
    /// Returns whether scroll rerouting is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool { self.enabled }

    /// Returns whether events from `device` are considered.
    #[must_use]
    pub fn accepts_device(&self, device: DeviceClass) -> bool { self.device_filter.contains(&device) }

    /// Rejects values that cannot be honored as written.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `hopLimit` exceeds [`MAX_HOP_LIMIT`].
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.hop_limit > MAX_HOP_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "scroll.hopLimit is {}, the maximum is {MAX_HOP_LIMIT}",
                self.hop_limit
            )));
        }
        Ok(())
    }

    /// Lookup cache lifetime in nanoseconds (event timestamp units).
    #[must_use]
    pub const fn lookup_cache_ttl_ns(&self) -> u64 {
        self.lookup_cache_ttl_ms.saturating_mul(1_000_000)
    }

    /// Accessibility timeout in seconds, as expected by the messaging API.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Precision loss is negligible for millisecond values
    pub fn accessibility_timeout_secs(&self) -> f32 {
        let millis = self
            .accessibility_timeout_ms
            .clamp(*ACCESSIBILITY_TIMEOUT_RANGE.start(), *ACCESSIBILITY_TIMEOUT_RANGE.end());
        millis as f32 / 1000.0
    }

    /// Returns a copy with the timeout clamped and duplicate devices removed.
    ///
    /// `hopLimit` is never rewritten; see [`ScrollConfig::check`].
    #[must_use]
    pub fn validated(mut self) -> Self {
        if !ACCESSIBILITY_TIMEOUT_RANGE.contains(&self.accessibility_timeout_ms) {
            tracing::warn!(
                timeout_ms = self.accessibility_timeout_ms,
                "accessibilityTimeoutMs out of range, clamping"
            );
            self.accessibility_timeout_ms = self.accessibility_timeout_ms.clamp(
                *ACCESSIBILITY_TIMEOUT_RANGE.start(),
                *ACCESSIBILITY_TIMEOUT_RANGE.end(),
            );
        }
        let mut seen = Vec::with_capacity(self.device_filter.len());
        self.device_filter.retain(|device| {
            let fresh = !seen.contains(device);
            seen.push(*device);
            fresh
        });
        self
    }
}
