//! JSON Schema generation for the Topscroll configuration.

use crate::config::TopscrollConfig;

/// Identifier embedded in the generated schema.
const SCHEMA_ID: &str =
    "https://raw.githubusercontent.com/topscroll/topscroll/main/topscroll.schema.json";

/// Generates a JSON Schema for the Topscroll configuration.
///
/// The schema includes all configuration options with their types,
/// descriptions, and default values.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(TopscrollConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(SCHEMA_ID));
    }

    schema
}

/// Returns the pretty-printed schema, ready to be saved next to a config file.
#[must_use]
pub fn print_schema() -> String { serde_json::to_string_pretty(&generate_schema()).unwrap_or_default() }
