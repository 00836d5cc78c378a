//! Replay fetch errors.
//!
//! A missing session and a flaky fetch must be handled differently: the
//! first drops the cached session id, the second leaves all state alone.

use std::fmt;

use super::network::NetworkError;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Backend answered 404: the session no longer exists.
    NotFound { session_id: String },

    /// Fetch failed for any other reason. State was not touched.
    Transient { source: NetworkError },

    /// The log body could not be parsed.
    InvalidLog { message: String },

    /// No session is bound to the context.
    NoSession,
}

impl ReplayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReplayError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReplayError::NotFound { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            ReplayError::NotFound { session_id } => {
                format!("Session '{}' no longer exists.", session_id)
            }
            ReplayError::Transient { source } => source.user_message(),
            ReplayError::InvalidLog { .. } => {
                "The backend returned an unreadable session log.".to_string()
            }
            ReplayError::NoSession => "No session selected.".to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ReplayError::NotFound { .. } => "E_REPLAY_NOT_FOUND",
            ReplayError::Transient { .. } => "E_REPLAY_TRANSIENT",
            ReplayError::InvalidLog { .. } => "E_REPLAY_INVALID",
            ReplayError::NoSession => "E_REPLAY_NO_SESSION",
        }
    }
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::NotFound { session_id } => write!(f, "Session not found: {}", session_id),
            ReplayError::Transient { source } => write!(f, "Replay fetch failed: {}", source),
            ReplayError::InvalidLog { message } => write!(f, "Invalid session log: {}", message),
            ReplayError::NoSession => write!(f, "No session bound"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Transient { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_vs_transient() {
        let gone = ReplayError::NotFound {
            session_id: "s1".to_string(),
        };
        assert!(gone.is_not_found());
        assert!(!gone.is_retryable());
        assert!(gone.user_message().contains("s1"));

        let flaky = ReplayError::Transient {
            source: NetworkError::Timeout {
                operation: "monitor".to_string(),
            },
        };
        assert!(!flaky.is_not_found());
        assert!(flaky.is_retryable());
        assert!(std::error::Error::source(&flaky).is_some());
    }
}
