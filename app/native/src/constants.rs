//! Application-wide constants.

/// Application name, used for thread names and CLI output.
pub const APP_NAME: &str = "topscroll";

/// Value written into the source user-data field of every injected event.
///
/// Events carrying it are recognized as our own and passed through.
pub const SYNTHETIC_EVENT_MARKER: i64 = 0x7473_6372_6f6c_6c; // "tscroll"

/// Environment variable that overrides the log filter.
pub const LOG_ENV_VAR: &str = "RUST_LOG";
