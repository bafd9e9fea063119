//! Configuration types for Topscroll.
//!
//! This module provides all configuration types organized by domain.
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod root;
pub mod scroll;

pub use root::{ConfigError, TopscrollConfig, config_paths, load_config, load_config_from_path};
pub use scroll::{MAX_HOP_LIMIT, ScrollConfig};
