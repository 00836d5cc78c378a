//! SSE frame and line types
//!
//! A frame is the unit the transport delivers: an event type plus the joined
//! data payload. Interpreting the payload is the decoder's job.

/// Event type used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One complete SSE frame as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` line, or [`DEFAULT_EVENT_TYPE`]
    pub event_type: String,
    /// All `data:` fragments joined with `\n`
    pub data: String,
}

impl SseFrame {
    /// Create a frame from its parts.
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
        }
    }

    /// Whether the frame used the default event type.
    pub fn is_default_type(&self) -> bool {
        self.event_type == DEFAULT_EVENT_TYPE
    }
}

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: llm_output")
    Event(String),
    /// Data payload fragment (e.g., "data: {\"round\": 1}")
    Data(String),
    /// Empty line - signals end of frame
    Empty,
    /// Comment line (starts with ':'), also used for unknown fields
    Comment(String),
}
