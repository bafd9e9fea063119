//! CLI output formatting utilities.
//!
//! This module provides utilities for formatting CLI output including:
//! - JSON syntax highlighting
//! - Colored status markers

use colored::Colorize;

/// Prints JSON with syntax highlighting.
///
/// Colors:
/// - Keys: Cyan
/// - Strings: Green
/// - Numbers: Yellow
/// - Booleans/Null: Magenta
/// - Brackets/Braces: White (default)
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json_str = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{}", highlight_json(&json_str));
}

/// Returns `json` with ANSI colors applied.
#[must_use]
pub fn highlight_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    let mut in_string = false;
    let mut is_key = false;
    let mut escape_next = false;
    let mut current_token = String::new();
    let mut after_colon = false;

    for ch in json.chars() {
        if escape_next {
            current_token.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current_token.push(ch);
            escape_next = true;
            continue;
        }

        match ch {
            '"' => {
                if in_string {
                    current_token.push(ch);
                    let colored = if is_key { current_token.cyan() } else { current_token.green() };
                    out.push_str(&colored.to_string());
                    current_token.clear();
                    in_string = false;
                    is_key = false;
                } else {
                    flush_token(&mut out, &mut current_token, after_colon);
                    current_token.push(ch);
                    in_string = true;
                    // It's a key if we're not after a colon
                    is_key = !after_colon;
                    after_colon = false;
                }
            }
            ':' if !in_string => {
                flush_token(&mut out, &mut current_token, false);
                out.push_str(&":".white().to_string());
                after_colon = true;
            }
            ',' if !in_string => {
                flush_token(&mut out, &mut current_token, after_colon);
                out.push_str(&",".white().to_string());
                after_colon = false;
            }
            '{' | '}' | '[' | ']' if !in_string => {
                flush_token(&mut out, &mut current_token, after_colon);
                out.push_str(&ch.to_string().white().bold().to_string());
                after_colon = false;
            }
            _ => current_token.push(ch),
        }
    }

    flush_token(&mut out, &mut current_token, after_colon);
    out
}

/// Appends the current token with appropriate coloring.
fn flush_token(out: &mut String, token: &mut String, is_value: bool) {
    if token.is_empty() {
        return;
    }

    if is_value && !token.trim().is_empty() {
        let start = token.find(|c: char| !c.is_whitespace()).unwrap_or(0);
        let end = token.rfind(|c: char| !c.is_whitespace()).map_or(token.len(), |i| i + 1);

        let prefix = &token[..start];
        let value = &token[start..end];
        let suffix = &token[end..];

        if value == "true" || value == "false" || value == "null" {
            out.push_str(&format!("{}{}{}", prefix, value.magenta(), suffix));
        } else if value.parse::<f64>().is_ok() {
            out.push_str(&format!("{}{}{}", prefix, value.yellow(), suffix));
        } else {
            out.push_str(token);
        }
    } else {
        out.push_str(token);
    }

    token.clear();
}

/// Formats a boolean as a colored string.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_preserves_text_without_colors() {
        colored::control::set_override(false);
        let json = "{\n  \"enabled\": true,\n  \"hopLimit\": 8\n}";
        assert_eq!(highlight_json(json), json);
        colored::control::unset_override();
    }

    #[test]
    fn test_highlight_handles_escaped_quotes() {
        colored::control::set_override(false);
        let json = r#"{"role": "AX\"Scroll\""}"#;
        assert_eq!(highlight_json(json), json);
        colored::control::unset_override();
    }

    #[test]
    fn test_format_bool_true() {
        assert!(format_bool(true).contains('✓'));
    }

    #[test]
    fn test_format_bool_false() {
        assert!(format_bool(false).contains('✗'));
    }
}
