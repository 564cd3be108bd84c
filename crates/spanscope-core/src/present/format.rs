//! Text formatting helpers

use serde_json::Value;

pub(super) const TIMESTAMP_WIDTH: usize = 19;
pub(super) const TRACE_TIMESTAMP_WIDTH: usize = 23;
pub(super) const MESSAGE_WIDTH: usize = 80;
pub(super) const EXCEPTION_WIDTH: usize = 100;
pub(super) const TRACE_ID_WIDTH: usize = 16;

/// At most `max_chars` characters, ending in `…` when cut
pub(super) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// The first `max_chars` characters
pub(super) fn prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(super) fn marker(is_exception: bool) -> &'static str {
    if is_exception {
        "❌"
    } else {
        "  "
    }
}

pub(super) fn endpoint_errors(errors: i64, error_rate: f64) -> String {
    if errors > 0 {
        format!("{errors} ({error_rate:.1}%)")
    } else {
        "0".to_string()
    }
}

/// Pretty JSON, every line indented four spaces
pub(super) fn attributes_block(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    pretty
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
