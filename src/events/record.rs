//! Decoded event record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::kind::EventKind;

/// One decoded execution event, after envelope normalisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub kind: EventKind,
    /// Inner payload, always an object
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl EventRecord {
    /// Build a record directly. Non-object payloads are wrapped as `{"value": ..}`.
    pub fn new(kind: impl Into<EventKind>, data: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: kind.into(),
            data: into_object(data),
            timestamp,
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Event time as epoch milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key).filter(|v| !v.is_null())
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// Explicit round number carried by the payload.
    ///
    /// Accepts integers and integral floats; anything else is treated as absent.
    pub fn round(&self) -> Option<i64> {
        match self.data.get("round")? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Token usage object: `data.usage` if present, else the payload itself.
    pub fn usage_source(&self) -> &Map<String, Value> {
        match self.data.get("usage") {
            Some(Value::Object(usage)) => usage,
            _ => &self.data,
        }
    }
}

pub(crate) fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Read a number that may have been sent as a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|f: &f64| f.is_finite())
}
