//! PHI/PII redaction rules.
//!
//! Two passes share one pattern table:
//! - `redact_phi` replaces every match with `[REDACTED]`; applied to query
//!   text before validation, so nothing downstream sees the raw value.
//! - `sanitize_for_logging` uses typed markers and is applied to anything
//!   headed for a log line.

use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

/// Pattern and the typed marker used in logs
static PHI_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // US social security numbers
        (
            Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
            "[SSN-REDACTED]",
        ),
        // 16-digit card numbers
        (Regex::new(r"\b\d{16}\b").unwrap(), "[CARD-REDACTED]"),
        // Email addresses
        (
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap(),
            "[EMAIL-REDACTED]",
        ),
    ]
});

/// Generic marker used in request text
pub const REDACTED: &str = "[REDACTED]";

/// Replace PHI patterns in request text with `[REDACTED]`
pub fn redact_phi(text: &str) -> String {
    let mut result = text.to_string();

    for (pattern, _) in PHI_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).to_string();
    }

    result
}

/// Redact incoming query text, noting in the log that redaction happened
pub fn redact_query_text(text: &str) -> String {
    if !contains_phi(text) {
        return text.to_string();
    }
    info!("PHI patterns found in query text; redacting before processing");
    redact_phi(text)
}

/// Replace PHI patterns with typed markers for log output
pub fn sanitize_for_logging(text: &str) -> String {
    let mut result = text.to_string();

    for (pattern, marker) in PHI_PATTERNS.iter() {
        result = pattern.replace_all(&result, *marker).to_string();
    }

    result
}

/// Recursively sanitize every string inside a JSON value
pub fn sanitize_value(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::String(s) => Value::String(sanitize_for_logging(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Check if text contains PHI patterns
pub fn contains_phi(text: &str) -> bool {
    PHI_PATTERNS
        .iter()
        .any(|(pattern, _)| pattern.is_match(text))
}
