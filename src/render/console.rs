//! Line-oriented console renderer.

use std::io::{self, Write};

use crate::engine::{MetricsView, SpeedSummary};
use crate::traits::{EntryHandle, EntryMeta, Renderer};

/// Placeholder for metrics that could not be computed.
const MISSING: &str = "—";

/// Writes one line per view event.
pub struct ConsoleRenderer {
    out: Box<dyn Write + Send>,
    next_handle: u64,
    show_details: bool,
    latest: MetricsView,
}

impl std::fmt::Debug for ConsoleRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleRenderer")
            .field("next_handle", &self.next_handle)
            .field("show_details", &self.show_details)
            .finish_non_exhaustive()
    }
}

impl ConsoleRenderer {
    /// Render to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            next_handle: 0,
            show_details: false,
            latest: MetricsView::default(),
        }
    }

    /// Also print request payloads.
    pub fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    /// Latest metrics pushed by the engine.
    pub fn metrics(&self) -> &MetricsView {
        &self.latest
    }

    fn line(&mut self, text: &str) {
        // Console output is best effort
        let _ = writeln!(self.out, "{}", text);
    }

    fn prefix(meta: &EntryMeta) -> String {
        let time = meta.timestamp.format("%H:%M:%S%.3f");
        match meta.round {
            Some(round) => format!("{} [r{}]", time, round),
            None => format!("{}     ", time),
        }
    }
}

fn dash_or<T>(value: Option<T>, render: impl Fn(T) -> String) -> String {
    value.map(render).unwrap_or_else(|| MISSING.to_string())
}

/// Human-readable metrics block.
pub fn format_metrics(metrics: &MetricsView) -> Vec<String> {
    let stats = &metrics.stats;
    let SpeedSummary {
        prefill_tokens,
        prefill_duration_s,
        prefill_speed,
        decode_tokens,
        decode_duration_s,
        decode_speed,
        ..
    } = &metrics.speed;

    vec![
        format!(
            "events {}  llm requests {}  knowledge requests {}  errors {}  pending {}",
            stats.events_processed,
            stats.llm_requests,
            stats.knowledge_requests,
            stats.errors,
            metrics.pending_requests
        ),
        format!(
            "tool calls {} ok / {} failed / {} sandboxed",
            stats.tool_calls_ok, stats.tool_calls_failed, stats.tool_calls_sandboxed
        ),
        format!(
            "tokens in {}  out {}  total {}{}",
            stats.token_input,
            stats.token_output,
            stats.token_total,
            if stats.usage_final { "" } else { " (partial)" }
        ),
        format!(
            "prefill {} tok  {}  {}",
            dash_or(*prefill_tokens, |t| t.to_string()),
            dash_or(*prefill_duration_s, |d| format!("{:.2}s", d)),
            dash_or(*prefill_speed, |s| format!("{:.1} tok/s", s)),
        ),
        format!(
            "decode {} tok  {}  {}",
            dash_or(*decode_tokens, |t| t.to_string()),
            dash_or(*decode_duration_s, |d| format!("{:.2}s", d)),
            dash_or(*decode_speed, |s| format!("{:.1} tok/s", s)),
        ),
    ]
}

impl Renderer for ConsoleRenderer {
    fn append_log_entry(&mut self, summary: &str, meta: &EntryMeta) {
        let line = format!("{} {}", Self::prefix(meta), summary);
        self.line(&line);
    }

    fn append_request_log_entry(
        &mut self,
        title: &str,
        detail: &str,
        meta: &EntryMeta,
    ) -> EntryHandle {
        self.next_handle += 1;
        let handle = EntryHandle(self.next_handle);
        let line = format!("{} #{} {}", Self::prefix(meta), handle.0, title);
        self.line(&line);
        if self.show_details {
            for detail_line in detail.lines() {
                self.line(&format!("      {}", detail_line));
            }
        }
        handle
    }

    fn annotate_duration(&mut self, handle: EntryHandle, text: &str) {
        self.line(&format!("  #{} took {}", handle.0, text));
    }

    fn attach_response(&mut self, handle: EntryHandle, text: &str) {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        self.line(&format!("  #{} -> {}", handle.0, first));
        for rest in lines {
            self.line(&format!("        {}", rest));
        }
    }

    fn clear(&mut self) {
        self.next_handle = 0;
        self.latest = MetricsView::default();
        self.line("---- replay ----");
    }

    fn update_metrics(&mut self, metrics: &MetricsView) {
        self.latest = metrics.clone();
    }
}
