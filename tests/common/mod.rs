//! Common test utilities for integration tests.
//!
//! Event builders, log fixtures and a context wired to recording adapters.
//!
//! # Example
//!
//! ```ignore
//! let (mut ctx, renderer) = test_context();
//! ctx.dispatch(record("llm_request", json!({"round": 1}), 0));
//! assert_eq!(renderer.log().requests.len(), 1);
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use debugscope::client::{DebugApiClient, SessionLog};
use debugscope::stream::{StreamController, StreamSettings};
use debugscope::{DebugContext, EventRecord};

/// Milliseconds since an arbitrary fixed origin.
pub fn ts(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
}

/// Decoded record at `ms`.
pub fn record(kind: &str, data: Value, ms: i64) -> EventRecord {
    EventRecord::new(kind, data, ts(ms))
}

/// Persisted log entry at `ms`, timestamp as RFC 3339.
pub fn stored(kind: &str, data: Value, ms: i64) -> Value {
    json!({"type": kind, "data": data, "timestamp": ts(ms).to_rfc3339()})
}

/// One SSE frame with an explicit event type.
pub fn sse_frame(kind: &str, data: &Value) -> String {
    format!("event: {}\ndata: {}\n\n", kind, data)
}

pub fn log_json(session_id: &str, status: &str, events: &[Value]) -> Value {
    json!({
        "session": {"session_id": session_id, "status": status},
        "events": events,
    })
}

pub fn session_log(session_id: &str, status: &str, events: &[Value]) -> SessionLog {
    serde_json::from_value(log_json(session_id, status, events)).unwrap()
}

/// Context with a recording renderer and an in-memory store.
pub fn test_context() -> (DebugContext, RecordingRenderer) {
    let renderer = RecordingRenderer::new();
    let ctx = DebugContext::new(
        Box::new(renderer.clone()),
        Arc::new(InMemorySessionStore::new()),
    );
    (ctx, renderer)
}

/// Settings small enough for tests to run in milliseconds.
pub fn fast_settings() -> StreamSettings {
    StreamSettings {
        poll_interval: std::time::Duration::from_millis(5),
        settle_step: std::time::Duration::from_millis(5),
        settle_cap: std::time::Duration::from_millis(200),
    }
}

pub fn test_controller(http: &MockHttpClient) -> StreamController {
    let client = DebugApiClient::new(Arc::new(http.clone()), BASE_URL);
    StreamController::new(client, fast_settings())
}

/// A two-round run with tool use, a knowledge lookup interleaved with the
/// second model call, usage reports and a final answer.
pub fn two_round_run() -> Vec<Value> {
    vec![
        stored("round_start", json!({"question": "q"}), 0),
        stored("llm_request", json!({"round": 1, "model": "m"}), 100),
        stored("llm_output_delta", json!({"round": 1, "delta": "a"}), 1100),
        stored("llm_output_delta", json!({"round": 1, "delta": "b"}), 1600),
        stored(
            "llm_output",
            json!({"round": 1, "content": "ab", "usage": {"input_tokens": 20, "output_tokens": 4}}),
            2100,
        ),
        stored(
            "token_usage",
            json!({"round": 1, "input_tokens": 20, "output_tokens": 4, "total_tokens": 24}),
            2150,
        ),
        stored("tool_call", json!({"tool": "search"}), 2200),
        stored("tool_result", json!({"tool": "search", "ok": true}), 2400),
        stored("knowledge_request", json!({"query": "x"}), 2500),
        stored("llm_request", json!({"round": 2, "model": "m"}), 2600),
        stored("llm_response", json!({"content": "kb"}), 2900),
        stored("llm_output_delta", json!({"round": 2, "delta": "c"}), 3100),
        stored(
            "llm_output",
            json!({"round": 2, "content": "c", "usage": {"input_tokens": 30, "output_tokens": 6}}),
            4100,
        ),
        stored(
            "token_usage",
            json!({"round": 2, "input_tokens": 30, "output_tokens": 6, "total_tokens": 36}),
            4150,
        ),
        stored("final", json!({"answer": "c", "usage": {"total_tokens": 70}}), 4200),
    ]
}
