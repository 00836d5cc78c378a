//! Streaming-related error types.
//!
//! Errors raised while a live `/wunder` stream is open. Malformed frames are
//! reported but never end the stream; transport failures do.

use std::fmt;

use crate::events::DecodeError;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Could not open the stream.
    OpenFailed { message: String },

    /// Stream connection was lost mid-read.
    ConnectionLost { message: String },

    /// Backend answered the stream request with a failure status.
    ServerStatus { status: u16, message: String },

    /// Invalid JSON in a frame.
    InvalidJson { event_type: String, message: String },

    /// A stream is already open on this context.
    AlreadyStreaming,

    /// Generic stream error.
    Other { message: String },
}

impl StreamError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::OpenFailed { .. } | StreamError::ConnectionLost { .. } => true,
            StreamError::ServerStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the error ends the stream (malformed frames do not).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamError::InvalidJson { .. })
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::OpenFailed { .. } => {
                "Could not start the agent run. Is the backend running?".to_string()
            }
            StreamError::ConnectionLost { .. } => {
                "Connection to the backend was lost during the run.".to_string()
            }
            StreamError::ServerStatus { status, message } => {
                format!("The backend refused the run (HTTP {}): {}", status, message)
            }
            StreamError::InvalidJson { event_type, .. } => {
                format!("Skipped a malformed '{}' event.", event_type)
            }
            StreamError::AlreadyStreaming => {
                "A run is already streaming in this session.".to_string()
            }
            StreamError::Other { message } => format!("Stream error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::OpenFailed { .. } => "E_STREAM_OPEN",
            StreamError::ConnectionLost { .. } => "E_STREAM_CONN",
            StreamError::ServerStatus { .. } => "E_STREAM_STATUS",
            StreamError::InvalidJson { .. } => "E_STREAM_JSON",
            StreamError::AlreadyStreaming => "E_STREAM_BUSY",
            StreamError::Other { .. } => "E_STREAM_OTHER",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::OpenFailed { message } => write!(f, "Failed to open stream: {}", message),
            StreamError::ConnectionLost { message } => {
                write!(f, "Stream connection lost: {}", message)
            }
            StreamError::ServerStatus { status, message } => {
                write!(f, "Stream rejected with HTTP {}: {}", status, message)
            }
            StreamError::InvalidJson {
                event_type,
                message,
            } => write!(f, "Invalid JSON for {} event: {}", event_type, message),
            StreamError::AlreadyStreaming => write!(f, "Stream already open"),
            StreamError::Other { message } => write!(f, "Stream error: {}", message),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<DecodeError> for StreamError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidJson {
                event_type,
                message,
            } => StreamError::InvalidJson {
                event_type,
                message,
            },
            other => StreamError::Other {
                message: other.to_string(),
            },
        }
    }
}
