//! Session state for one debug context.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle status of an agent run as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Cancelling,
    Finished,
    Error,
    Cancelled,
}

impl SessionStatus {
    /// Active sessions keep the poll scheduler running.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Cancelling)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Cancelling => "cancelling",
            SessionStatus::Finished => "finished",
            SessionStatus::Error => "error",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Lenient parse of a backend status string. Unknown values are idle.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "running" => SessionStatus::Running,
            "cancelling" => SessionStatus::Cancelling,
            "finished" => SessionStatus::Finished,
            "error" => SessionStatus::Error,
            "cancelled" => SessionStatus::Cancelled,
            _ => SessionStatus::Idle,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map(SessionStatus::parse).unwrap_or_default())
    }
}

/// Session bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    /// Number of log events already reconciled into local state
    pub event_cursor: usize,
    /// Local state was rebuilt from the backend log at least once
    pub restored: bool,
    /// A live connection is open
    pub streaming: bool,
    /// A `final` event was dispatched since the last reset
    pub final_seen: bool,
}

impl Session {
    pub fn new(session_id: Option<String>) -> Self {
        Self {
            session_id,
            ..Self::default()
        }
    }

    /// Forget replay progress without touching the id or status.
    pub fn reset_progress(&mut self) {
        self.event_cursor = 0;
        self.restored = false;
        self.final_seen = false;
    }
}
