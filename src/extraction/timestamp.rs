//! Timestamp normalisation.
//!
//! Clients send timestamps as RFC 3339 (with or without fractional
//! seconds) or as a stringified integer. Everything internal is integer
//! Unix milliseconds, UTC.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Parse a JSON value that may be a string (RFC 3339 or stringified
/// milliseconds) or a bare number, into Unix milliseconds.
pub fn parse_timestamp_ms(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    None
}

/// Format Unix milliseconds as RFC 3339 with millisecond precision, the
/// wire format used in `deletedAt`/`updatedAt` fields.
pub fn format_rfc3339_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
