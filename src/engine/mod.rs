//! Debug-session engine
//!
//! [`DebugContext`] owns everything derived from one agent run: session
//! bookkeeping, the round map, the pending-request queue, counters, and the
//! renderer the results are pushed into. Live frames and replayed log entries
//! both enter through [`DebugContext::dispatch`], so the two delivery paths
//! cannot drift apart.
//!
//! # Module structure
//! - `session` - Session id, status and replay cursor
//! - `rounds` - Round reconstruction and speed summary (RoundTracker)
//! - `correlator` - FIFO request/response pairing (RequestCorrelator)
//! - `stats` - Counters and token usage merge policies (DebugStats)

mod correlator;
mod rounds;
mod session;
mod stats;

pub use correlator::{
    format_duration, summarize_response, Completion, PendingRequest, RequestCorrelator,
    RequestPurpose,
};
pub use rounds::{
    ImplicitRounds, RoundMetrics, RoundResolver, RoundTracker, RoundUpdate, SpeedSummary,
    MIN_PREFILL_DURATION_S,
};
pub use session::{Session, SessionStatus};
pub use stats::{DebugStats, UsageSample};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::events::{DecodeError, EventKind, EventRecord};
use crate::traits::{EntryMeta, Renderer, SessionStore};

/// Longest summary text put on a single log line.
const SUMMARY_MAX_CHARS: usize = 160;

/// Everything the renderer needs to draw the metrics panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsView {
    pub stats: DebugStats,
    pub speed: SpeedSummary,
    pub pending_requests: usize,
}

/// Comparable copy of the engine state, renderer excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub stats: DebugStats,
    pub rounds: BTreeMap<i64, RoundMetrics>,
    pub speed: SpeedSummary,
    pub pending: Vec<PendingRequest>,
}

/// What dispatching one record did.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub round: RoundUpdate,
    pub completion: Option<Completion>,
}

/// Engine state for one open debug panel.
pub struct DebugContext {
    session: Session,
    rounds: RoundTracker,
    correlator: RequestCorrelator,
    stats: DebugStats,
    renderer: Box<dyn Renderer>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for DebugContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugContext")
            .field("session", &self.session)
            .field("rounds", &self.rounds)
            .field("pending", &self.correlator.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DebugContext {
    /// Create a context, restoring the last session id from `store`.
    pub fn new(renderer: Box<dyn Renderer>, store: Arc<dyn SessionStore>) -> Self {
        let session = Session::new(store.load());
        Self {
            session,
            rounds: RoundTracker::new(),
            correlator: RequestCorrelator::new(),
            stats: DebugStats::new(),
            renderer,
            store,
        }
    }

    /// Swap the round inference heuristic.
    pub fn with_resolver(mut self, resolver: Box<dyn RoundResolver>) -> Self {
        self.rounds = RoundTracker::with_resolver(resolver);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.session_id.as_deref()
    }

    pub fn stats(&self) -> &DebugStats {
        &self.stats
    }

    pub fn rounds(&self) -> &RoundTracker {
        &self.rounds
    }

    pub fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }

    pub fn metrics(&self) -> MetricsView {
        MetricsView {
            stats: self.stats.clone(),
            speed: self.rounds.summary().clone(),
            pending_requests: self.correlator.len(),
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            stats: self.stats.clone(),
            rounds: self.rounds.rounds().clone(),
            speed: self.rounds.summary().clone(),
            pending: self.correlator.pending().cloned().collect(),
        }
    }

    /// Route one decoded record to every consumer.
    pub fn dispatch(&mut self, record: EventRecord) -> DispatchReport {
        if self.session.session_id.is_none() {
            if let Some(id) = record.session_id.as_deref() {
                self.adopt_session_id(id);
            }
        }

        self.stats.record(&record);
        let round = self.rounds.observe(&record);
        let meta = EntryMeta::new(record.kind.clone(), record.timestamp).with_round(match round {
            RoundUpdate::Tracked(r) => Some(r),
            _ => record.round(),
        });

        let mut completion = None;
        if record.kind.is_request() {
            let (title, detail) = request_entry(&record, meta.round);
            let handle = self
                .renderer
                .append_request_log_entry(&title, &detail, &meta);
            self.correlator.enqueue(&record, handle);
        } else if record.kind != EventKind::LlmOutputDelta {
            self.renderer.append_log_entry(&log_summary(&record), &meta);
            if record.kind.is_response() {
                completion = self.correlator.complete(&record, self.renderer.as_mut());
                if completion.is_none() {
                    debug!(kind = %record.kind, "Response with no open request");
                }
            }
            match record.kind {
                EventKind::TokenUsage => {
                    self.stats.apply_additive(&UsageSample::from_record(&record));
                }
                EventKind::Final => {
                    self.stats.apply_override(&UsageSample::from_record(&record));
                    self.session.final_seen = true;
                }
                _ => {}
            }
        }

        let metrics = self.metrics();
        self.renderer.update_metrics(&metrics);
        DispatchReport { round, completion }
    }

    /// Log a frame that failed to decode. The stream keeps going.
    pub fn report_parse_error(&mut self, err: &DecodeError, at: DateTime<Utc>) {
        warn!(error = %err, "Dropping malformed event");
        let meta = EntryMeta::new(EventKind::Other("parse_error".to_string()), at);
        self.renderer
            .append_log_entry(&format!("parse_error: {}", err), &meta);
    }

    /// Fail every open request. Returns how many were flushed.
    pub fn flush_pending(&mut self, message: Option<&str>, at: DateTime<Utc>) -> usize {
        let flushed = self
            .correlator
            .flush_failed(message, at, self.renderer.as_mut());
        if flushed > 0 {
            debug!(flushed, "Flushed pending requests as failed");
            let metrics = self.metrics();
            self.renderer.update_metrics(&metrics);
        }
        flushed
    }

    /// Clear derived state (stats, rounds, queue, renderer) before a full
    /// replay. Session id and status are kept.
    pub fn reset_engine(&mut self) {
        self.stats.reset();
        self.rounds.reset();
        self.correlator.reset();
        self.session.final_seen = false;
        self.renderer.clear();
        let metrics = self.metrics();
        self.renderer.update_metrics(&metrics);
    }

    /// Drop everything, including the session id.
    pub fn reset_session(&mut self) {
        self.reset_engine();
        self.session = Session::default();
    }

    /// Take `session_id` as the active session without resetting.
    pub fn adopt_session_id(&mut self, session_id: &str) {
        debug!(session_id, "Adopting session id");
        self.session.session_id = Some(session_id.to_string());
        if let Err(e) = self.store.persist(session_id) {
            warn!(error = %e, "Failed to persist session id");
        }
    }

    /// Switch to `session_id`. A different id resets all local state.
    pub fn bind_session(&mut self, session_id: &str) {
        if self.session_id() == Some(session_id) {
            return;
        }
        self.reset_session();
        self.adopt_session_id(session_id);
    }

    /// The backend no longer knows this session: drop the cached id.
    pub fn forget_session(&mut self) {
        self.session.session_id = None;
        self.session.reset_progress();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session id");
        }
    }

    /// Clear the stored session id.
    pub(crate) fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session id");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

fn first_str<'a>(record: &'a EventRecord, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| record.str_field(k))
        .find(|s| !s.trim().is_empty())
}

fn request_entry(record: &EventRecord, round: Option<i64>) -> (String, String) {
    let mut title = match record.kind {
        EventKind::KnowledgeRequest => "Knowledge request".to_string(),
        _ => "LLM request".to_string(),
    };
    if let Some(model) = first_str(record, &["model", "model_name", "base"]) {
        title.push_str(&format!(" [{}]", model));
    }
    if let Some(round) = round {
        title.push_str(&format!(" (round {})", round));
    }
    let detail = serde_json::to_string_pretty(&Value::Object(record.data.clone()))
        .unwrap_or_default();
    (title, detail)
}

/// One-line description of a non-request event.
pub fn log_summary(record: &EventRecord) -> String {
    let kind = record.kind.as_str();
    let detail = match &record.kind {
        EventKind::Progress | EventKind::Compaction | EventKind::PlanUpdate => {
            first_str(record, &["summary", "message", "stage", "value"]).map(str::to_string)
        }
        EventKind::ToolCall => first_str(record, &["tool", "name"]).map(str::to_string),
        EventKind::ToolResult => {
            let tool = first_str(record, &["tool", "name"]).unwrap_or("tool");
            let failed =
                record.bool_field("ok") == Some(false) || record.field("error").is_some();
            Some(format!("{} ({})", tool, if failed { "failed" } else { "ok" }))
        }
        EventKind::TokenUsage => {
            let usage = UsageSample::from_record(record);
            Some(format!(
                "in {} / out {}",
                usage.input.map_or("-".to_string(), |v| v.to_string()),
                usage.output.map_or("-".to_string(), |v| v.to_string()),
            ))
        }
        EventKind::LlmResponse
        | EventKind::LlmOutput
        | EventKind::Final
        | EventKind::Error => Some(summarize_response(record)),
        EventKind::LlmStreamRetry => {
            first_str(record, &["reason", "message", "error"]).map(str::to_string)
        }
        _ => None,
    };
    match detail {
        Some(detail) => format!("{}: {}", kind, truncate(&detail, SUMMARY_MAX_CHARS)),
        None => kind.to_string(),
    }
}
