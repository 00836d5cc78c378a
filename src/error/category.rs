//! Error category classification.
//!
//! Categories drive the handling decision at the edges of the engine:
//! retry a fetch, drop a session, or report and move on.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS, timeout. Transient.
    Network,

    /// Backend returned a failure status (5xx) or broke the stream.
    /// Transient.
    Server,

    /// Malformed data from the backend, or a bug on our side.
    Client,

    /// Something the user has to fix (unknown session, bad arguments).
    User,

    /// Filesystem and OS errors.
    System,

    /// Missing or invalid configuration.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::User => "user",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Suggested recovery action.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check that the agent backend is reachable and try again",
            ErrorCategory::Server => "The backend may be overloaded. Try again shortly",
            ErrorCategory::Client => "The backend sent data this client does not understand",
            ErrorCategory::User => "Check the session id or command arguments",
            ErrorCategory::System => "Check file permissions for the session store",
            ErrorCategory::Configuration => "Check the DEBUGSCOPE_* environment variables",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
