//! Recording renderer for testing.
//!
//! Every call is captured in a shared [`RenderLog`]. Clones share the same
//! log, so a test can hand one clone to a `DebugContext` and inspect the
//! other.

use std::sync::{Arc, Mutex};

use crate::engine::MetricsView;
use crate::traits::{EntryHandle, EntryMeta, Renderer};

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEntry {
    pub summary: String,
    pub meta: EntryMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRequest {
    pub handle: EntryHandle,
    pub title: String,
    pub detail: String,
    pub meta: EntryMeta,
}

/// Everything rendered since the last `clear`, plus the clear count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderLog {
    pub entries: Vec<LoggedEntry>,
    pub requests: Vec<LoggedRequest>,
    pub durations: Vec<(EntryHandle, String)>,
    pub responses: Vec<(EntryHandle, String)>,
    pub metrics: Vec<MetricsView>,
    pub clears: usize,
    next_handle: u64,
}

impl RenderLog {
    /// Duration badges attached to `handle`, in order.
    pub fn durations(&self, handle: EntryHandle) -> Vec<String> {
        Self::for_handle(&self.durations, handle)
    }

    /// Responses attached to `handle`, in order.
    pub fn responses(&self, handle: EntryHandle) -> Vec<String> {
        Self::for_handle(&self.responses, handle)
    }

    pub fn summaries(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.summary.clone()).collect()
    }

    fn for_handle(items: &[(EntryHandle, String)], handle: EntryHandle) -> Vec<String> {
        items
            .iter()
            .filter(|(h, _)| *h == handle)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

/// Renderer that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RenderLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the log so far.
    pub fn log(&self) -> RenderLog {
        self.log.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn append_log_entry(&mut self, summary: &str, meta: &EntryMeta) {
        self.log.lock().unwrap().entries.push(LoggedEntry {
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
        let mut log = self.log.lock().unwrap();
        log.next_handle += 1;
        let handle = EntryHandle(log.next_handle);
        log.requests.push(LoggedRequest {
            handle,
            title: title.to_string(),
            detail: detail.to_string(),
            meta: meta.clone(),
        });
        handle
    }

    fn annotate_duration(&mut self, handle: EntryHandle, text: &str) {
        self.log
            .lock()
            .unwrap()
            .durations
            .push((handle, text.to_string()));
    }

    fn attach_response(&mut self, handle: EntryHandle, text: &str) {
        self.log
            .lock()
            .unwrap()
            .responses
            .push((handle, text.to_string()));
    }

    fn clear(&mut self) {
        let mut log = self.log.lock().unwrap();
        let clears = log.clears + 1;
        *log = RenderLog {
            clears,
            ..RenderLog::default()
        };
    }

    fn update_metrics(&mut self, metrics: &MetricsView) {
        self.log.lock().unwrap().metrics.push(metrics.clone());
    }
}
