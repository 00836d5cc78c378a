//! Timestamp parsing for event payloads.
//!
//! The backend is inconsistent about time formats: live events carry RFC 3339
//! strings, the persisted log uses naive `YYYY-MM-DD HH:MM:SS` strings, and
//! some tool payloads send epoch numbers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Numbers at or above this are epoch milliseconds, below it epoch seconds.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse any supported timestamp representation.
///
/// Returns `None` for null, empty strings, unparseable text and non-finite
/// numbers.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch_number),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// Parse a textual timestamp.
pub fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    text.parse::<f64>().ok().and_then(from_epoch_number)
}

/// Interpret an epoch number, seconds or milliseconds by magnitude.
pub fn from_epoch_number(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value >= EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}
