//! Request/response pairing.
//!
//! Requests and responses carry no shared identifier. A response completes
//! the oldest open request, so pairing is strictly by arrival order. If the
//! backend ever reorders responses (retried streams, parallel tool-driven
//! model calls) badges will land on the wrong entry; that is accepted here
//! and must not be "fixed" by guessing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;

use crate::events::{EventKind, EventRecord};
use crate::traits::{EntryHandle, Renderer};

/// What a pending request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPurpose {
    Llm,
    Knowledge,
}

impl RequestPurpose {
    pub fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::LlmRequest => Some(RequestPurpose::Llm),
            EventKind::KnowledgeRequest => Some(RequestPurpose::Knowledge),
            _ => None,
        }
    }
}

/// An open request waiting for its response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingRequest {
    pub id: u64,
    pub enqueued_at: DateTime<Utc>,
    pub purpose: RequestPurpose,
    pub matched: bool,
    pub handle: EntryHandle,
}

/// Result of pairing one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub request: PendingRequest,
    pub duration_s: f64,
    pub response: String,
}

/// FIFO queue of open requests shared by llm and knowledge requests.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    queue: VecDeque<PendingRequest>,
    next_id: u64,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a request for `record`, already rendered as `handle`.
    pub fn enqueue(&mut self, record: &EventRecord, handle: EntryHandle) -> Option<u64> {
        let purpose = RequestPurpose::from_kind(&record.kind)?;
        self.next_id += 1;
        self.queue.push_back(PendingRequest {
            id: self.next_id,
            enqueued_at: record.timestamp,
            purpose,
            matched: false,
            handle,
        });
        Some(self.next_id)
    }

    /// Complete the oldest open request with `record` and render the result.
    pub fn complete(
        &mut self,
        record: &EventRecord,
        renderer: &mut dyn Renderer,
    ) -> Option<Completion> {
        let mut request = self.queue.pop_front()?;
        request.matched = true;

        let duration_s = seconds_between(request.enqueued_at, record.timestamp);
        let response = summarize_response(record);
        renderer.annotate_duration(request.handle, &format_duration(duration_s));
        renderer.attach_response(request.handle, &response);

        Some(Completion {
            request,
            duration_s,
            response,
        })
    }

    /// Fail every open request, e.g. when the stream ended without `final`.
    pub fn flush_failed(
        &mut self,
        message: Option<&str>,
        at: DateTime<Utc>,
        renderer: &mut dyn Renderer,
    ) -> usize {
        let text = format!("request error: {}", message.unwrap_or("no response"));
        let flushed = self.queue.len();
        for request in self.queue.drain(..) {
            let duration_s = seconds_between(request.enqueued_at, at);
            renderer.annotate_duration(request.handle, &format_duration(duration_s));
            renderer.attach_response(request.handle, &text);
        }
        flushed
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingRequest> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.next_id = 0;
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds().max(0)) as f64 / 1000.0
}

/// Duration badge text.
pub fn format_duration(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}

fn non_empty_str<'a>(record: &'a EventRecord, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| record.str_field(k))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Normalised response text: content, reasoning, tool calls, error, or a
/// marker when the response carried nothing.
pub fn summarize_response(record: &EventRecord) -> String {
    if let Some(content) = non_empty_str(record, &["content", "answer"]) {
        return content.to_string();
    }
    if let Some(reasoning) = non_empty_str(record, &["reasoning", "reasoning_content"]) {
        return reasoning.to_string();
    }
    if let Some(calls) = record.field("tool_calls").filter(|v| match v {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => false,
    }) {
        return serde_json::to_string_pretty(calls).unwrap_or_else(|_| calls.to_string());
    }
    if let Some(message) = error_message(record) {
        return message;
    }
    "(no content)".to_string()
}

fn error_message(record: &EventRecord) -> Option<String> {
    if let Some(message) = non_empty_str(record, &["message", "error", "detail"]) {
        return Some(message.to_string());
    }
    match record.field("error") {
        Some(Value::Object(err)) => err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(Value::Object(err.clone()).to_string())),
        _ => None,
    }
}
