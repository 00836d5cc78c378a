//! Unified error type for the debug engine.

use std::fmt;

use super::category::ErrorCategory;
use super::network::NetworkError;
use super::replay::ReplayError;
use super::stream::StreamError;
use super::system::SystemError;

/// Unified error type.
///
/// Consolidates the domain errors so callers at the edge (the CLI, an
/// embedding UI) can categorise and report uniformly.
#[derive(Debug)]
pub enum DebugError {
    /// Network-related errors (connections, HTTP, timeouts).
    Network(NetworkError),

    /// Live stream errors.
    Stream(StreamError),

    /// Session log fetch and replay errors.
    Replay(ReplayError),

    /// Filesystem errors.
    System(SystemError),

    /// Invalid configuration value.
    Configuration { key: String, message: String },
}

impl DebugError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DebugError::Network(NetworkError::HttpStatus { status, .. }) if *status >= 500 => {
                ErrorCategory::Server
            }
            DebugError::Network(NetworkError::HttpStatus { .. }) => ErrorCategory::User,
            DebugError::Network(_) => ErrorCategory::Network,
            DebugError::Stream(err) => match err {
                StreamError::OpenFailed { .. } | StreamError::ConnectionLost { .. } => {
                    ErrorCategory::Network
                }
                StreamError::ServerStatus { status, .. } if *status >= 500 => {
                    ErrorCategory::Server
                }
                StreamError::ServerStatus { .. } | StreamError::AlreadyStreaming => {
                    ErrorCategory::User
                }
                StreamError::InvalidJson { .. } | StreamError::Other { .. } => {
                    ErrorCategory::Client
                }
            },
            DebugError::Replay(err) => match err {
                ReplayError::NotFound { .. } | ReplayError::NoSession => ErrorCategory::User,
                ReplayError::Transient { .. } => ErrorCategory::Network,
                ReplayError::InvalidLog { .. } => ErrorCategory::Client,
            },
            DebugError::System(_) => ErrorCategory::System,
            DebugError::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            DebugError::Network(err) => err.is_retryable(),
            DebugError::Stream(err) => err.is_retryable(),
            DebugError::Replay(err) => err.is_retryable(),
            DebugError::System(_) | DebugError::Configuration { .. } => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            DebugError::Network(err) => err.user_message(),
            DebugError::Stream(err) => err.user_message(),
            DebugError::Replay(err) => err.user_message(),
            DebugError::System(err) => err.user_message(),
            DebugError::Configuration { key, message } => {
                format!("Invalid value for {}: {}", key, message)
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            DebugError::Network(err) => err.error_code(),
            DebugError::Stream(err) => err.error_code(),
            DebugError::Replay(err) => err.error_code(),
            DebugError::System(err) => err.error_code(),
            DebugError::Configuration { .. } => "E_CONFIG",
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for DebugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugError::Network(err) => write!(f, "{}", err),
            DebugError::Stream(err) => write!(f, "{}", err),
            DebugError::Replay(err) => write!(f, "{}", err),
            DebugError::System(err) => write!(f, "{}", err),
            DebugError::Configuration { key, message } => {
                write!(f, "Configuration error for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for DebugError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DebugError::Network(err) => Some(err),
            DebugError::Stream(err) => Some(err),
            DebugError::Replay(err) => Some(err),
            DebugError::System(err) => Some(err),
            DebugError::Configuration { .. } => None,
        }
    }
}

// ============================================================================
// From implementations for automatic error conversion
// ============================================================================

impl From<NetworkError> for DebugError {
    fn from(err: NetworkError) -> Self {
        DebugError::Network(err)
    }
}

impl From<StreamError> for DebugError {
    fn from(err: StreamError) -> Self {
        DebugError::Stream(err)
    }
}

impl From<ReplayError> for DebugError {
    fn from(err: ReplayError) -> Self {
        DebugError::Replay(err)
    }
}

impl From<SystemError> for DebugError {
    fn from(err: SystemError) -> Self {
        DebugError::System(err)
    }
}

impl From<std::io::Error> for DebugError {
    fn from(err: std::io::Error) -> Self {
        DebugError::System(super::system::classify_io_error(err, None, "I/O operation"))
    }
}
