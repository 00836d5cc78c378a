//! Renderer implementations
//!
//! The engine pushes view events into a [`Renderer`]. Two sinks ship with
//! the crate:
//!
//! - [`ChannelRenderer`] - Broadcasts serialisable [`ViewEvent`]s to any
//!   number of subscribers (embedding UIs)
//! - [`ConsoleRenderer`] - Writes one line per event (CLI)

mod console;

pub use console::{format_metrics, ConsoleRenderer};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::engine::MetricsView;
use crate::traits::{EntryHandle, EntryMeta, Renderer};

/// Default channel capacity for [`ChannelRenderer`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// One renderer call, as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    LogEntry {
        summary: String,
        meta: EntryMeta,
    },
    RequestEntry {
        handle: EntryHandle,
        title: String,
        detail: String,
        meta: EntryMeta,
    },
    Duration {
        handle: EntryHandle,
        text: String,
    },
    Response {
        handle: EntryHandle,
        text: String,
    },
    Clear,
    Metrics(MetricsView),
}

/// Renderer that broadcasts every call as a [`ViewEvent`].
///
/// Sends never block; with no subscribers events are dropped, and slow
/// subscribers see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    tx: broadcast::Sender<ViewEvent>,
    next_handle: u64,
}

impl ChannelRenderer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, next_handle: 0 }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.tx.subscribe()
    }

    fn emit(&self, event: ViewEvent) {
        // Err only means nobody is listening
        let _ = self.tx.send(event);
    }
}

impl Default for ChannelRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Renderer for ChannelRenderer {
    fn append_log_entry(&mut self, summary: &str, meta: &EntryMeta) {
        self.emit(ViewEvent::LogEntry {
            summary: summary.to_string(),
            meta: meta.clone(),
        });
    }

    fn append_request_log_entry(
        &mut self,
        title: &str,
        detail: &str,
        meta: &EntryMeta,
    ) -> EntryHandle {
        self.next_handle += 1;
        let handle = EntryHandle(self.next_handle);
        self.emit(ViewEvent::RequestEntry {
            handle,
            title: title.to_string(),
            detail: detail.to_string(),
            meta: meta.clone(),
        });
        handle
    }

    fn annotate_duration(&mut self, handle: EntryHandle, text: &str) {
        self.emit(ViewEvent::Duration {
            handle,
            text: text.to_string(),
        });
    }

    fn attach_response(&mut self, handle: EntryHandle, text: &str) {
        self.emit(ViewEvent::Response {
            handle,
            text: text.to_string(),
        });
    }

    fn clear(&mut self) {
        self.next_handle = 0;
        self.emit(ViewEvent::Clear);
    }

    fn update_metrics(&mut self, metrics: &MetricsView) {
        self.emit(ViewEvent::Metrics(metrics.clone()));
    }
}
