//! Incremental SSE frame parser
//!
//! Bytes arrive in arbitrary chunks. The parser buffers until it sees a
//! complete line, accumulates `event:`/`data:` lines, and emits a frame on
//! every blank line. Anything after the last newline stays buffered.

use crate::sse::events::{SseFrame, SseLine, DEFAULT_EVENT_TYPE};

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        // Only the single separator space belongs to the syntax
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        return SseLine::Data(value.to_string());
    }

    // Unknown field (id:, retry:, ...) - treat as comment
    SseLine::Comment(line.to_string())
}

/// Stateful frame parser for one connection.
#[derive(Debug, Default)]
pub struct SseFrameParser {
    /// Undecoded tail of the last chunk (incomplete UTF-8 sequence)
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    buffer: String,
    /// Current event type being accumulated
    current_event_type: Option<String>,
    /// Accumulated data lines
    data_buffer: Vec<String>,
}

impl SseFrameParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk, returning every frame it completes.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending_bytes.extend_from_slice(chunk);

        let bytes = std::mem::take(&mut self.pending_bytes);
        match std::str::from_utf8(&bytes) {
            Ok(text) => self.buffer.push_str(text),
            Err(e) => {
                let valid = e.valid_up_to();
                self.buffer
                    .push_str(&String::from_utf8_lossy(&bytes[..valid]));
                match e.error_len() {
                    // Truncated sequence: wait for the next chunk
                    None => self.pending_bytes = bytes[valid..].to_vec(),
                    Some(bad) => {
                        self.buffer.push(char::REPLACEMENT_CHARACTER);
                        let rest = bytes[valid + bad..].to_vec();
                        return self.drain_lines_then(rest);
                    }
                }
            }
        }

        self.drain_lines()
    }

    /// Feed a text chunk, returning every frame it completes.
    pub fn push_str(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.push_bytes(chunk.as_bytes())
    }

    fn drain_lines_then(&mut self, rest: Vec<u8>) -> Vec<SseFrame> {
        let mut frames = self.drain_lines();
        if !rest.is_empty() {
            frames.extend(self.push_bytes(&rest));
        }
        frames
    }

    /// Process every complete line currently buffered.
    fn drain_lines(&mut self) -> Vec<SseFrame> {
        let buffer = std::mem::take(&mut self.buffer);
        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = buffer[start..].find('\n') {
            let end = start + offset;
            if let Some(frame) = self.feed_line(buffer[start..end].trim_end_matches('\r')) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.buffer = buffer;
        self.buffer.drain(..start);
        frames
    }

    /// Feed one line (without its terminator).
    pub fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        match parse_sse_line(line) {
            SseLine::Event(event_type) => {
                self.current_event_type = Some(event_type);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.try_emit_frame(),
            SseLine::Comment(_) => None,
        }
    }

    /// Flush at end of body: an unterminated final frame is still emitted.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = line.trim_end_matches('\r').to_string();
            if let Some(frame) = self.feed_line(&line) {
                return Some(frame);
            }
        }
        self.try_emit_frame()
    }

    fn try_emit_frame(&mut self) -> Option<SseFrame> {
        let event_type = self.current_event_type.take();
        if self.data_buffer.is_empty() {
            return None;
        }

        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();

        let event_type = event_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
        Some(SseFrame { event_type, data })
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.pending_bytes.clear();
        self.buffer.clear();
        self.current_event_type = None;
        self.data_buffer.clear();
    }
}
