//! Renderer sink abstraction.
//!
//! The engine never draws anything. It computes view events and pushes them
//! into a [`Renderer`], which is write-only from the engine's side.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::MetricsView;
use crate::events::EventKind;

/// Opaque handle to a request log entry, issued by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntryHandle(pub u64);

/// Metadata attached to every log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryMeta {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<i64>,
}

impl EntryMeta {
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            round: None,
        }
    }

    pub fn with_round(mut self, round: Option<i64>) -> Self {
        self.round = round;
        self
    }
}

/// Sink for computed view events.
///
/// # Example
///
/// ```ignore
/// use debugscope::traits::{EntryHandle, EntryMeta, Renderer};
///
/// struct Silent(u64);
///
/// impl Renderer for Silent {
///     fn append_log_entry(&mut self, _summary: &str, _meta: &EntryMeta) {}
///     fn append_request_log_entry(&mut self, _t: &str, _d: &str, _m: &EntryMeta) -> EntryHandle {
///         self.0 += 1;
///         EntryHandle(self.0)
///     }
///     fn annotate_duration(&mut self, _h: EntryHandle, _text: &str) {}
///     fn attach_response(&mut self, _h: EntryHandle, _text: &str) {}
///     fn clear(&mut self) {}
/// }
/// ```
pub trait Renderer: Send {
    /// Append a plain event log line.
    fn append_log_entry(&mut self, summary: &str, meta: &EntryMeta);

    /// Append a request entry that will later receive a duration badge and
    /// a response.
    fn append_request_log_entry(&mut self, title: &str, detail: &str, meta: &EntryMeta)
        -> EntryHandle;

    /// Attach a duration badge (e.g. `1.00s`) to a request entry.
    fn annotate_duration(&mut self, handle: EntryHandle, text: &str);

    /// Attach the response summary to a request entry.
    fn attach_response(&mut self, handle: EntryHandle, text: &str);

    /// Drop everything rendered so far (full replay, new session).
    fn clear(&mut self);

    /// Latest derived counters and speeds.
    fn update_metrics(&mut self, _metrics: &MetricsView) {}
}
