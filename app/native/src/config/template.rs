//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
///
/// This creates a JSONC file documenting every available option with its
/// default value.
#[must_use]
pub fn generate_config_template() -> String {
    r##"// Topscroll Configuration File
// ============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.
//
// Changes are applied while Topscroll is running.

{
  // ============================================================================
  // Scroll Rerouting
  // ============================================================================
  // Sends scroll input to the nearest scrollable area under the pointer
  // when the element under the pointer would not scroll it itself.
  // "scroll": {
  //   // Enable or disable rerouting
  //   "enabled": true,
  //
  //   // Devices whose scroll events are rerouted: "wheel", "trackpad"
  //   "deviceFilter": ["wheel", "trackpad"],
  //
  //   // Maximum number of parent elements inspected when looking for a
  //   // scrollable area (0-64; 0 accepts only the element under the pointer)
  //   "hopLimit": 8,
  //
  //   // Timeout for a single accessibility query in milliseconds (1-1000)
  //   "accessibilityTimeoutMs": 50,
  //
  //   // Reuse a lookup for events at the same pixel for this long.
  //   // Set to 0 to disable.
  //   "lookupCacheTtlMs": 120,
  //
  //   // Drop trackpad momentum that outlives a display, space or app change
  //   "suppressStaleMomentum": true
  // }
}
"##
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopscrollConfig;

    #[test]
    fn test_generate_config_template_is_valid_jsonc() {
        let template = generate_config_template();
        let stripped = json_comments::StripComments::new(template.as_bytes());
        let config: TopscrollConfig = serde_json::from_reader(stripped).unwrap();
        assert_eq!(config, TopscrollConfig::default());
    }

    #[test]
    fn test_generate_config_template_mentions_every_option() {
        let template = generate_config_template();
        for key in [
            "enabled",
            "deviceFilter",
            "hopLimit",
            "accessibilityTimeoutMs",
            "lookupCacheTtlMs",
            "suppressStaleMomentum",
        ] {
            assert!(template.contains(key), "template is missing {key}");
        }
    }

    #[test]
    fn test_create_config_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.jsonc");
        create_config_file(&path).unwrap();
        assert!(path.exists());
    }
}
