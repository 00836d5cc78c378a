//! Round reconstruction and prefill/decode speed derivation.
//!
//! A round is one model inference turn. Rounds are rebuilt from the event
//! sequence: request boundaries wipe the map, `llm_request` opens a round,
//! output events stamp timing, usage events fill in token counts. The speed
//! summary is recomputed after every accumulation.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::events::{as_number, EventKind, EventRecord};

/// Prefill windows shorter than this are clamped up to it.
pub const MIN_PREFILL_DURATION_S: f64 = 0.05;

/// Timing and token metrics of one round. Every field is unset until observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoundMetrics {
    pub start_ms: Option<i64>,
    pub first_output_ms: Option<i64>,
    pub last_output_ms: Option<i64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub prefill_duration_s: Option<f64>,
    pub decode_duration_s: Option<f64>,
}

impl RoundMetrics {
    /// Merge usage fields, keeping the first non-null value of each.
    fn merge_usage(&mut self, usage: &Map<String, Value>, timing: &Map<String, Value>) {
        if self.input_tokens.is_none() {
            self.input_tokens = token_count(usage, &["input_tokens", "prompt_tokens"]);
        }
        if self.output_tokens.is_none() {
            self.output_tokens = token_count(usage, &["output_tokens", "completion_tokens"]);
        }
        if self.prefill_duration_s.is_none() {
            self.prefill_duration_s = seconds(timing, usage, "prefill_duration_s");
        }
        if self.decode_duration_s.is_none() {
            self.decode_duration_s = seconds(timing, usage, "decode_duration_s");
        }
    }

    fn has_output_tokens(&self) -> bool {
        self.output_tokens.is_some_and(|t| t > 0)
    }

    /// This round's own output window in seconds.
    fn output_window_s(&self) -> Option<f64> {
        match (self.first_output_ms, self.last_output_ms) {
            (Some(first), Some(last)) if last > first => Some((last - first) as f64 / 1000.0),
            _ => None,
        }
    }
}

fn token_count(source: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|k| source.get(*k).and_then(as_number))
        .find(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

fn seconds(primary: &Map<String, Value>, fallback: &Map<String, Value>, key: &str) -> Option<f64> {
    primary
        .get(key)
        .and_then(as_number)
        .or_else(|| fallback.get(key).and_then(as_number))
        .filter(|s| *s >= 0.0)
}

/// Derived throughput figures. `None` renders as a dash.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeedSummary {
    pub first_round: Option<i64>,
    pub latest_round: Option<i64>,
    pub prefill_tokens: Option<u64>,
    pub prefill_duration_s: Option<f64>,
    pub prefill_speed: Option<f64>,
    pub decode_tokens: Option<u64>,
    pub decode_duration_s: Option<f64>,
    pub decode_speed: Option<f64>,
}

fn speed(tokens: Option<u64>, duration_s: Option<f64>) -> Option<f64> {
    match (tokens, duration_s) {
        (Some(t), Some(d)) if t > 0 && d > 0.0 => Some(t as f64 / d),
        _ => None,
    }
}

/// Strategy for assigning a round id to a round-metric event.
///
/// Backends that omit `round` on `llm_request` need a heuristic; swapping it
/// does not touch the rest of the tracker.
pub trait RoundResolver: Send + fmt::Debug {
    /// Round for `record`, or `None` if it cannot be tracked.
    fn resolve(&mut self, record: &EventRecord, last_round_seen: Option<i64>) -> Option<i64>;

    /// Forget any inference state (called on request boundaries).
    fn reset(&mut self);
}

/// Default resolver: explicit round, else a counter bumped by each
/// `llm_request`, else the last round seen.
#[derive(Debug, Clone, Default)]
pub struct ImplicitRounds {
    implicit_round: i64,
}

impl RoundResolver for ImplicitRounds {
    fn resolve(&mut self, record: &EventRecord, last_round_seen: Option<i64>) -> Option<i64> {
        if let Some(round) = record.round() {
            self.implicit_round = self.implicit_round.max(round);
            return Some(round);
        }
        if record.kind == EventKind::LlmRequest {
            self.implicit_round += 1;
            return Some(self.implicit_round);
        }
        last_round_seen
    }

    fn reset(&mut self) {
        self.implicit_round = 0;
    }
}

/// What [`RoundTracker::observe`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundUpdate {
    /// Not a round-metric event
    Ignored,
    /// Round-metric event with no resolvable round
    Untracked,
    /// Accumulated into this round
    Tracked(i64),
}

/// Per-session round map plus derived speed summary.
#[derive(Debug)]
pub struct RoundTracker {
    rounds: BTreeMap<i64, RoundMetrics>,
    first_round: Option<i64>,
    latest_round: Option<i64>,
    last_round_seen: Option<i64>,
    request_start_ms: Option<i64>,
    resolver: Box<dyn RoundResolver>,
    summary: SpeedSummary,
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self::with_resolver(Box::new(ImplicitRounds::default()))
    }
}

impl RoundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: Box<dyn RoundResolver>) -> Self {
        Self {
            rounds: BTreeMap::new(),
            first_round: None,
            latest_round: None,
            last_round_seen: None,
            request_start_ms: None,
            resolver,
            summary: SpeedSummary::default(),
        }
    }

    pub fn rounds(&self) -> &BTreeMap<i64, RoundMetrics> {
        &self.rounds
    }

    pub fn round(&self, id: i64) -> Option<&RoundMetrics> {
        self.rounds.get(&id)
    }

    pub fn summary(&self) -> &SpeedSummary {
        &self.summary
    }

    pub fn last_round_seen(&self) -> Option<i64> {
        self.last_round_seen
    }

    pub fn request_start_ms(&self) -> Option<i64> {
        self.request_start_ms
    }

    /// Whether `record` starts a new top-level request.
    pub fn is_boundary(&self, record: &EventRecord) -> bool {
        let named = match &record.kind {
            EventKind::Other(name) => name == "round_start" || name == "received",
            EventKind::Progress => record.str_field("stage") == Some("start"),
            _ => false,
        };
        let restarted = matches!(
            (record.round(), self.last_round_seen),
            (Some(round), Some(seen)) if round < seen
        );
        named || restarted
    }

    /// Feed one event.
    pub fn observe(&mut self, record: &EventRecord) -> RoundUpdate {
        let ts = record.timestamp_ms();

        if self.is_boundary(record) {
            debug!(kind = %record.kind, round = ?record.round(), "Request boundary, resetting rounds");
            self.reset();
            self.request_start_ms = Some(ts);
        }

        if !record.kind.is_round_metric() {
            return RoundUpdate::Ignored;
        }

        let Some(round) = self.resolver.resolve(record, self.last_round_seen) else {
            debug!(kind = %record.kind, "No round for event, not tracked");
            return RoundUpdate::Untracked;
        };

        self.last_round_seen = Some(round);
        if self.first_round.is_none() {
            self.first_round = Some(round);
        }

        let entry = self.rounds.entry(round).or_default();
        match record.kind {
            EventKind::LlmRequest => {
                entry.start_ms.get_or_insert(ts);
            }
            EventKind::LlmOutputDelta => {
                entry.first_output_ms.get_or_insert(ts);
                entry.last_output_ms = Some(ts);
            }
            EventKind::LlmOutput => {
                entry.first_output_ms.get_or_insert(ts);
                entry.last_output_ms = Some(ts);
                let usage = match record.data.get("usage") {
                    Some(Value::Object(usage)) => usage.clone(),
                    _ => Map::new(),
                };
                entry.merge_usage(&usage, &record.data);
            }
            EventKind::TokenUsage => {
                entry.merge_usage(record.usage_source(), &record.data);
            }
            _ => {}
        }

        if entry.has_output_tokens() {
            self.latest_round = Some(round);
        }

        self.recompute_speed_summary();
        RoundUpdate::Tracked(round)
    }

    /// Clear all rounds and counters.
    pub fn reset(&mut self) {
        self.rounds.clear();
        self.first_round = None;
        self.latest_round = None;
        self.last_round_seen = None;
        self.request_start_ms = None;
        self.resolver.reset();
        self.summary = SpeedSummary::default();
    }

    fn pick_first_round(&self) -> Option<i64> {
        self.rounds
            .iter()
            .filter_map(|(id, m)| m.first_output_ms.map(|t| (t, *id)))
            .min()
            .map(|(_, id)| id)
            .or(self.first_round.filter(|id| self.rounds.contains_key(id)))
            .or_else(|| self.rounds.keys().next().copied())
    }

    fn pick_latest_round(&self) -> Option<i64> {
        self.latest_round
            .filter(|id| self.rounds.contains_key(id))
            .or(self.last_round_seen.filter(|id| self.rounds.contains_key(id)))
            .or_else(|| self.rounds.keys().next_back().copied())
    }

    fn recompute_speed_summary(&mut self) {
        let (Some(first_id), Some(latest_id)) = (self.pick_first_round(), self.pick_latest_round())
        else {
            self.summary = SpeedSummary::default();
            return;
        };
        let (Some(first), Some(latest)) = (self.rounds.get(&first_id), self.rounds.get(&latest_id))
        else {
            self.summary = SpeedSummary::default();
            return;
        };

        // Prefill: request start to first output of the first round
        let prefill_start = self
            .rounds
            .values()
            .filter_map(|m| m.start_ms)
            .min()
            .or(self.request_start_ms);
        let observed_prefill = match (prefill_start, first.first_output_ms) {
            (Some(start), Some(end)) if end >= start => Some((end - start) as f64 / 1000.0),
            _ => None,
        };
        let prefill_duration_s = match (first.prefill_duration_s, observed_prefill) {
            (Some(reported), Some(observed)) => Some(reported.max(observed)),
            (reported, observed) => reported.or(observed),
        }
        .map(|d| d.max(MIN_PREFILL_DURATION_S));
        let prefill_tokens = first.input_tokens;

        // Decode: first output anywhere to last output anywhere
        let decode_start = self.rounds.values().filter_map(|m| m.first_output_ms).min();
        let decode_end = self.rounds.values().filter_map(|m| m.last_output_ms).max();
        let observed_decode = match (decode_start, decode_end) {
            (Some(start), Some(end)) if end > start => Some((end - start) as f64 / 1000.0),
            _ => None,
        };
        let reported_decode: f64 = self
            .rounds
            .values()
            .filter_map(|m| m.decode_duration_s)
            .filter(|d| *d > 0.0)
            .sum();
        let decode_duration_s = observed_decode
            .or((reported_decode > 0.0).then_some(reported_decode))
            .or_else(|| latest.output_window_s());

        let summed_output: u64 = self
            .rounds
            .values()
            .filter_map(|m| m.output_tokens)
            .filter(|t| *t > 0)
            .fold(0, u64::saturating_add);
        let decode_tokens = if summed_output > 0 {
            Some(summed_output)
        } else {
            latest.output_tokens
        };

        self.summary = SpeedSummary {
            first_round: Some(first_id),
            latest_round: Some(latest_id),
            prefill_tokens,
            prefill_duration_s,
            prefill_speed: speed(prefill_tokens, prefill_duration_s),
            decode_tokens,
            decode_duration_s,
            decode_speed: speed(decode_tokens, decode_duration_s),
        };
    }
}
