//! Sensitive data sanitization for logs and error trails
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use position_gateway::core::logging::SanitizedValue;
//!
//! let api_key = "sk-1234567890abcdef";
//! tracing::debug!(api_key = %SanitizedValue::new(api_key), "Signing request");
//! // Output: api_key = "sk-1...REDACTED"
//! ```

use std::fmt;

/// Sensitive field patterns that should be redacted in logs.
///
/// Use `SanitizedValue` or `sanitize_signature()` when logging any
/// field matching these patterns.
pub const SENSITIVE_FIELD_PATTERNS: &[&str] = &[
    "api_key",
    "api-key",
    "apikey",
    "access-key",
    "access_key",
    "secret",
    "sign",
    "passphrase",
    "password",
    "token",
    "credential",
];

/// Placeholder substituted for response bodies in redacted fallback trails
pub const REDACTED_SNIPPET: &str = "<redacted>";

/// Wrapper for sensitive data that should be redacted in logs.
///
/// When displayed via `Display` or `Debug`, the value is redacted to show
/// only the first few characters followed by "...REDACTED" or just "REDACTED"
/// for short values.
#[derive(Clone)]
pub struct SanitizedValue<'a>(&'a str);

impl<'a> SanitizedValue<'a> {
    pub fn new(value: &'a str) -> Self {
        Self(value)
    }
}

impl<'a> fmt::Display for SanitizedValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.chars().count() > 8 {
            let head: String = self.0.chars().take(4).collect();
            write!(f, "{}...REDACTED", head)
        } else {
            write!(f, "REDACTED")
        }
    }
}

impl<'a> fmt::Debug for SanitizedValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SanitizedValue(***)")
    }
}

/// Shorthand for `SanitizedValue::new(value)`.
pub fn sanitize(value: &str) -> SanitizedValue<'_> {
    SanitizedValue::new(value)
}

/// Sanitize a signature by showing only the first 8 characters.
pub fn sanitize_signature(sig: &str) -> String {
    if sig.len() > 12 && sig.is_char_boundary(8) {
        format!("{}...", &sig[..8])
    } else {
        "REDACTED".to_string()
    }
}

/// Whether a field name looks like it carries secret material
///
/// Any name ending in `key` counts, so exchange-specific key headers are
/// covered without listing each one.
pub fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("key") || SENSITIVE_FIELD_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Cut `text` to at most `max_chars` characters, on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Response body as it may appear in a user-visible fallback trail
pub fn trail_snippet(body: &str, max_chars: usize, redact: bool) -> String {
    if redact {
        REDACTED_SNIPPET.to_string()
    } else {
        truncate_chars(body.trim(), max_chars).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_value_long() {
        assert_eq!(format!("{}", sanitize("sk-1234567890abcdef")), "sk-1...REDACTED");
    }

    #[test]
    fn test_sanitized_value_short_and_empty() {
        assert_eq!(format!("{}", sanitize("abc")), "REDACTED");
        assert_eq!(format!("{}", sanitize("")), "REDACTED");
    }

    #[test]
    fn test_sanitized_value_debug_never_leaks() {
        let debug = format!("{:?}", sanitize("sk-1234567890abcdef"));
        assert_eq!(debug, "SanitizedValue(***)");
    }

    #[test]
    fn test_sanitize_signature() {
        assert_eq!(
            sanitize_signature("337e7e81a0620156b443510e1fef4b05"),
            "337e7e81..."
        );
        assert_eq!(sanitize_signature("short"), "REDACTED");
    }

    #[test]
    fn test_sensitive_field_detection() {
        assert!(is_sensitive_field("X-BAPI-SIGN"));
        assert!(is_sensitive_field("OK-ACCESS-PASSPHRASE"));
        assert!(is_sensitive_field("api_key"));
        assert!(is_sensitive_field("api-key"));
        assert!(is_sensitive_field("X-BAPI-API-KEY"));
        assert!(is_sensitive_field("OK-ACCESS-KEY"));
        assert!(is_sensitive_field("apikey"));
        assert!(!is_sensitive_field("symbol"));
        assert!(!is_sensitive_field("X-BAPI-RECV-WINDOW"));
        assert!(!is_sensitive_field("language"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_trail_snippet_redaction() {
        assert_eq!(trail_snippet("{\"balance\":\"1234\"}", 120, true), REDACTED_SNIPPET);
        assert_eq!(trail_snippet("  bad gateway  ", 3, false), "bad");
    }
}
