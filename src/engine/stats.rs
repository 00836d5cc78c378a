//! Session counters and token totals.
//!
//! Counters only ever grow. Token usage arrives through two channels with
//! different merge rules: intermediate `token_usage` events are deltas and
//! are summed, while terminal usage (`final`, single-shot responses) is a
//! snapshot of the whole run and is merged as a high watermark.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::events::{as_number, EventKind, EventRecord};

/// One usage sample as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageSample {
    pub input: Option<f64>,
    pub output: Option<f64>,
    pub total: Option<f64>,
}

impl UsageSample {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let read = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| map.get(*k).and_then(as_number))
                .next()
        };
        Self {
            input: read(&["input_tokens", "prompt_tokens"]),
            output: read(&["output_tokens", "completion_tokens"]),
            total: read(&["total_tokens"]),
        }
    }

    /// Usage of a record: `data.usage` if present, else top-level fields.
    pub fn from_record(record: &EventRecord) -> Self {
        Self::from_map(record.usage_source())
    }

    /// At least one field is a positive finite number.
    pub fn is_meaningful(&self) -> bool {
        [self.input, self.output, self.total]
            .iter()
            .flatten()
            .any(|v| v.is_finite() && *v > 0.0)
    }

    fn count(value: Option<f64>) -> Option<u64> {
        value
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    }

    fn input_count(&self) -> Option<u64> {
        Self::count(self.input)
    }

    fn output_count(&self) -> Option<u64> {
        Self::count(self.output)
    }

    /// Explicit total, else input + output.
    fn total_count(&self) -> Option<u64> {
        Self::count(self.total).or_else(|| match (self.input_count(), self.output_count()) {
            (None, None) => None,
            (input, output) => Some(input.unwrap_or(0).saturating_add(output.unwrap_or(0))),
        })
    }
}

/// Aggregate counters for one debug context.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugStats {
    pub events_processed: u64,
    pub llm_requests: u64,
    pub knowledge_requests: u64,
    pub errors: u64,
    pub tool_calls_ok: u64,
    pub tool_calls_failed: u64,
    pub tool_calls_sandboxed: u64,
    pub token_input: u64,
    pub token_output: u64,
    pub token_total: u64,
    /// Terminal usage has been applied at least once
    pub usage_final: bool,
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl DebugStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dispatched event.
    pub fn record(&mut self, record: &EventRecord) {
        self.events_processed += 1;
        self.first_event_at = Some(match self.first_event_at {
            Some(first) => first.min(record.timestamp),
            None => record.timestamp,
        });
        self.last_event_at = Some(match self.last_event_at {
            Some(last) => last.max(record.timestamp),
            None => record.timestamp,
        });

        match record.kind {
            EventKind::LlmRequest => self.llm_requests += 1,
            EventKind::KnowledgeRequest => self.knowledge_requests += 1,
            EventKind::Error => self.errors += 1,
            EventKind::ToolResult => {
                let failed =
                    record.bool_field("ok") == Some(false) || record.field("error").is_some();
                if failed {
                    self.tool_calls_failed += 1;
                } else {
                    self.tool_calls_ok += 1;
                }
                if record.bool_field("sandbox") == Some(true) {
                    self.tool_calls_sandboxed += 1;
                }
            }
            _ => {}
        }
    }

    /// Sum a usage delta into the running totals.
    pub fn apply_additive(&mut self, usage: &UsageSample) {
        self.token_input = self.token_input.saturating_add(usage.input_count().unwrap_or(0));
        self.token_output = self
            .token_output
            .saturating_add(usage.output_count().unwrap_or(0));
        self.token_total = self.token_total.saturating_add(usage.total_count().unwrap_or(0));
    }

    /// Merge a usage snapshot.
    ///
    /// The first meaningful snapshot replaces the additive totals field by
    /// field. Later ones act as a high watermark, so displayed totals never
    /// decrease after that. Returns false when the sample carried nothing
    /// meaningful and was ignored.
    pub fn apply_override(&mut self, usage: &UsageSample) -> bool {
        if !usage.is_meaningful() {
            return false;
        }
        let merge = |current: u64, new: u64, first: bool| if first { new } else { current.max(new) };
        let first = !self.usage_final;
        if let Some(input) = usage.input_count() {
            self.token_input = merge(self.token_input, input, first);
        }
        if let Some(output) = usage.output_count() {
            self.token_output = merge(self.token_output, output, first);
        }
        if let Some(total) = usage.total_count() {
            self.token_total = merge(self.token_total, total, first);
        }
        self.usage_final = true;
        true
    }

    /// Wall-clock span covered by the events, in seconds.
    pub fn elapsed_s(&self) -> Option<f64> {
        match (self.first_event_at, self.last_event_at) {
            (Some(first), Some(last)) => Some((last - first).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    pub fn tool_calls_total(&self) -> u64 {
        self.tool_calls_ok + self.tool_calls_failed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
