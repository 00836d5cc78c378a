//! Frame and log-entry decoding.
//!
//! Both delivery paths funnel through [`normalize`], so every consumer sees
//! one canonical [`EventRecord`] shape regardless of how many envelopes the
//! backend wrapped around the payload.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

use super::kind::EventKind;
use super::record::{into_object, EventRecord};
use super::timestamp::parse_timestamp;
use crate::sse::SseFrame;

/// Keys an envelope object may carry.
const ENVELOPE_KEYS: [&str; 5] = ["data", "timestamp", "session_id", "type", "event"];

/// Live payloads use one envelope, legacy log entries nest a second one.
pub const MAX_ENVELOPE_DEPTH: usize = 2;

/// Overrides applied while decoding.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Takes precedence over any payload timestamp
    pub timestamp: Option<DateTime<Utc>>,
    /// Clock used when no timestamp is available (defaults to `Utc::now()`)
    pub now: Option<DateTime<Utc>>,
}

impl DecodeOptions {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            now: None,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// Why a frame or stored entry was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Frame payload is not valid JSON.
    InvalidJson { event_type: String, message: String },
    /// Stored log entry has no `type`.
    MissingType,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidJson {
                event_type,
                message,
            } => write!(f, "Invalid JSON in '{}' event: {}", event_type, message),
            DecodeError::MissingType => write!(f, "Stored event has no type"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Result of envelope normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub data: Map<String, Value>,
    /// Timestamp from the outermost envelope that had one
    pub timestamp: Option<Value>,
    pub session_id: Option<String>,
    /// `type`/`event` string from the outermost level that had one
    pub kind_hint: Option<String>,
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    matches!(map.get("data"), Some(Value::Object(_)))
        && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()))
}

fn kind_name(map: &Map<String, Value>) -> Option<String> {
    ["type", "event"]
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Unwrap up to `depth` envelope levels.
///
/// Outer values win for timestamp, session id and kind hint. When no envelope
/// supplied one, the inner payload's own fields are used.
pub fn normalize(value: Value, depth: usize) -> Normalized {
    let mut payload = into_object(value);
    let mut timestamp: Option<Value> = None;
    let mut session_id: Option<String> = None;
    let mut kind_hint: Option<String> = None;

    for _ in 0..depth {
        if !is_envelope(&payload) {
            break;
        }
        if kind_hint.is_none() {
            kind_hint = kind_name(&payload);
        }
        if timestamp.is_none() {
            timestamp = payload.remove("timestamp").filter(|v| !v.is_null());
        }
        if session_id.is_none() {
            session_id = payload
                .remove("session_id")
                .and_then(|v| v.as_str().map(str::to_string));
        }
        let Some(Value::Object(inner)) = payload.remove("data") else {
            break;
        };
        payload = inner;
    }

    if kind_hint.is_none() {
        kind_hint = kind_name(&payload);
    }
    if timestamp.is_none() {
        timestamp = payload.get("timestamp").filter(|v| !v.is_null()).cloned();
    }
    if session_id.is_none() {
        session_id = payload
            .get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string);
    }

    Normalized {
        data: payload,
        timestamp,
        session_id,
        kind_hint,
    }
}

fn resolve_timestamp(options: &DecodeOptions, payload_ts: Option<&Value>) -> DateTime<Utc> {
    options
        .timestamp
        .or_else(|| payload_ts.and_then(parse_timestamp))
        .unwrap_or_else(|| options.now())
}

/// Decode one live SSE frame.
pub fn decode_frame(frame: &SseFrame, options: &DecodeOptions) -> Result<EventRecord, DecodeError> {
    let value: Value =
        serde_json::from_str(frame.data.trim()).map_err(|e| DecodeError::InvalidJson {
            event_type: frame.event_type.clone(),
            message: e.to_string(),
        })?;

    let normalized = normalize(value, MAX_ENVELOPE_DEPTH);
    let kind = match (&normalized.kind_hint, frame.is_default_type()) {
        (Some(hint), true) => EventKind::from(hint.as_str()),
        _ => EventKind::from(frame.event_type.as_str()),
    };

    Ok(EventRecord {
        kind,
        timestamp: resolve_timestamp(options, normalized.timestamp.as_ref()),
        data: normalized.data,
        session_id: normalized.session_id,
    })
}

/// Decode one persisted log entry (`{type, data, timestamp}`).
///
/// The entry is the first envelope level; its `data` may nest one more.
pub fn decode_stored(entry: &Value, options: &DecodeOptions) -> Result<EventRecord, DecodeError> {
    let Some(map) = entry.as_object() else {
        return Err(DecodeError::MissingType);
    };
    let kind = kind_name(map).ok_or(DecodeError::MissingType)?;

    let data = map.get("data").cloned().unwrap_or(Value::Null);
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    };
    let inner = normalize(data, MAX_ENVELOPE_DEPTH - 1);

    let outer_ts = map.get("timestamp").filter(|v| !v.is_null());
    let session_id = map
        .get("session_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(inner.session_id);

    Ok(EventRecord {
        kind: EventKind::from(kind.as_str()),
        timestamp: resolve_timestamp(options, outer_ts.or(inner.timestamp.as_ref())),
        data: inner.data,
        session_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DecodeOptions {
        DecodeOptions {
            timestamp: None,
            now: Some(Utc.timestamp_millis_opt(42).unwrap()),
        }
    }

    #[test]
    fn test_decode_live_envelope() {
        let frame = SseFrame::new(
            "llm_output",
            r#"{"data":{"content":"hi"},"timestamp":"1970-01-01T00:00:01Z","session_id":"s1"}"#,
        );
        let rec = decode_frame(&frame, &fixed_now()).unwrap();
        assert_eq!(rec.kind, EventKind::LlmOutput);
        assert_eq!(rec.data.get("content"), Some(&json!("hi")));
        assert_eq!(rec.timestamp_ms(), 1000);
        assert_eq!(rec.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_decode_nested_legacy_envelope_outer_wins() {
        let frame = SseFrame::new(
            "tool_result",
            r#"{"data":{"data":{"ok":true},"timestamp":5},"timestamp":7}"#,
        );
        let rec = decode_frame(&frame, &fixed_now()).unwrap();
        assert_eq!(rec.data.get("ok"), Some(&json!(true)));
        assert_eq!(rec.timestamp_ms(), 7000);
    }

    #[test]
    fn test_unwrap_stops_at_two_levels() {
        let value = json!({"data": {"data": {"data": {"x": 1}}}});
        let normalized = normalize(value, MAX_ENVELOPE_DEPTH);
        assert_eq!(normalized.data, into_object(json!({"data": {"x": 1}})));
    }

    #[test]
    fn test_non_envelope_payload_untouched() {
        // `content` is not an envelope key, so this is the payload itself
        let frame = SseFrame::new("llm_output", r#"{"data":{"a":1},"content":"x"}"#);
        let rec = decode_frame(&frame, &fixed_now()).unwrap();
        assert_eq!(rec.data.get("content"), Some(&json!("x")));
        assert!(rec.data.contains_key("data"));
    }

    #[test]
    fn test_bare_string_payload() {
        let frame = SseFrame::new("progress", r#""thinking""#);
        let rec = decode_frame(&frame, &fixed_now()).unwrap();
        assert_eq!(rec.data.get("value"), Some(&json!("thinking")));
        assert_eq!(rec.timestamp_ms(), 42);
    }

    #[test]
    fn test_message_frame_takes_type_from_payload() {
        let frame = SseFrame::new("message", r#"{"type":"final","data":{"answer":"a"}}"#);
        let rec = decode_frame(&frame, &fixed_now()).unwrap();
        assert_eq!(rec.kind, EventKind::Final);

        let frame = SseFrame::new("message", r#"{"event":"error","data":{"message":"m"}}"#);
        assert_eq!(decode_frame(&frame, &fixed_now()).unwrap().kind, EventKind::Error);

        // Explicit frame type wins over payload hint
        let frame = SseFrame::new("llm_output", r#"{"type":"final","data":{}}"#);
        assert_eq!(
            decode_frame(&frame, &fixed_now()).unwrap().kind,
            EventKind::LlmOutput
        );
    }

    #[test]
    fn test_invalid_json() {
        let frame = SseFrame::new("llm_output", "{not json");
        let err = decode_frame(&frame, &fixed_now()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson { ref event_type, .. } if event_type == "llm_output"));
    }

    #[test]
    fn test_option_timestamp_wins() {
        let frame = SseFrame::new("final", r#"{"data":{},"timestamp":7}"#);
        let opts = DecodeOptions::at(Utc.timestamp_millis_opt(99).unwrap());
        assert_eq!(decode_frame(&frame, &opts).unwrap().timestamp_ms(), 99);
    }

    #[test]
    fn test_decode_stored_entry() {
        let entry = json!({
            "type": "llm_request",
            "data": {"round": 2, "model": "m"},
            "timestamp": "1970-01-01 00:00:03"
        });
        let rec = decode_stored(&entry, &fixed_now()).unwrap();
        assert_eq!(rec.kind, EventKind::LlmRequest);
        assert_eq!(rec.round(), Some(2));
        assert_eq!(rec.timestamp_ms(), 3000);
    }

    #[test]
    fn test_decode_stored_legacy_nesting() {
        let entry = json!({
            "type": "token_usage",
            "data": {"data": {"input_tokens": 4}, "timestamp": 2, "session_id": "s9"},
        });
        let rec = decode_stored(&entry, &fixed_now()).unwrap();
        assert_eq!(rec.data.get("input_tokens"), Some(&json!(4)));
        assert_eq!(rec.timestamp_ms(), 2000);
        assert_eq!(rec.session_id.as_deref(), Some("s9"));
    }

    #[test]
    fn test_decode_stored_scalar_data_and_missing_type() {
        let entry = json!({"type": "progress", "data": "step"});
        let rec = decode_stored(&entry, &fixed_now()).unwrap();
        assert_eq!(rec.data.get("value"), Some(&json!("step")));

        assert_eq!(
            decode_stored(&json!({"data": {}}), &fixed_now()),
            Err(DecodeError::MissingType)
        );
        assert_eq!(
            decode_stored(&json!(3), &fixed_now()),
            Err(DecodeError::MissingType)
        );
    }
}
