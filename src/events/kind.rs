//! Event kinds emitted by the agent backend.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of an execution event.
///
/// The set is closed except for [`EventKind::Other`], which keeps the raw
/// name of anything the backend adds later (`round_start`, `received`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Progress,
    Compaction,
    ToolCall,
    ToolResult,
    PlanUpdate,
    QuestionPanel,
    LlmRequest,
    LlmResponse,
    KnowledgeRequest,
    LlmOutputDelta,
    LlmOutput,
    LlmStreamRetry,
    TokenUsage,
    A2ui,
    Final,
    Error,
    /// Unrecognised event name
    Other(String),
}

impl EventKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Progress => "progress",
            EventKind::Compaction => "compaction",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::PlanUpdate => "plan_update",
            EventKind::QuestionPanel => "question_panel",
            EventKind::LlmRequest => "llm_request",
            EventKind::LlmResponse => "llm_response",
            EventKind::KnowledgeRequest => "knowledge_request",
            EventKind::LlmOutputDelta => "llm_output_delta",
            EventKind::LlmOutput => "llm_output",
            EventKind::LlmStreamRetry => "llm_stream_retry",
            EventKind::TokenUsage => "token_usage",
            EventKind::A2ui => "a2ui",
            EventKind::Final => "final",
            EventKind::Error => "error",
            EventKind::Other(name) => name,
        }
    }

    /// Kinds that open a request log entry and wait for a response.
    pub fn is_request(&self) -> bool {
        matches!(self, EventKind::LlmRequest | EventKind::KnowledgeRequest)
    }

    /// Kinds that complete the oldest pending request.
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            EventKind::LlmResponse | EventKind::LlmOutput | EventKind::Error
        )
    }

    /// Kinds that carry per-round model metrics.
    pub fn is_round_metric(&self) -> bool {
        matches!(
            self,
            EventKind::LlmRequest
                | EventKind::LlmOutputDelta
                | EventKind::LlmOutput
                | EventKind::TokenUsage
        )
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "progress" => EventKind::Progress,
            "compaction" => EventKind::Compaction,
            "tool_call" => EventKind::ToolCall,
            "tool_result" => EventKind::ToolResult,
            "plan_update" => EventKind::PlanUpdate,
            "question_panel" => EventKind::QuestionPanel,
            "llm_request" => EventKind::LlmRequest,
            "llm_response" => EventKind::LlmResponse,
            "knowledge_request" => EventKind::KnowledgeRequest,
            "llm_output_delta" => EventKind::LlmOutputDelta,
            "llm_output" => EventKind::LlmOutput,
            "llm_stream_retry" => EventKind::LlmStreamRetry,
            "token_usage" => EventKind::TokenUsage,
            "a2ui" => EventKind::A2ui,
            "final" => EventKind::Final,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EventKind::from(name.as_str()))
    }
}
