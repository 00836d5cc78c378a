//! Network-related error types.
//!
//! Transport failures arrive as [`HttpError`] from whichever
//! [`HttpClient`](crate::traits::HttpClient) is plugged in; they are
//! classified here into the variants the engine reacts to.

use std::fmt;

use crate::traits::HttpError;

/// Network-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Connection to the backend failed.
    ConnectionFailed { url: String, message: String },

    /// Request timed out.
    Timeout { operation: String },

    /// HTTP status error (non-2xx response).
    HttpStatus { status: u16, message: String },

    /// Response body could not be decoded.
    InvalidResponse { message: String },

    /// Generic network error.
    Other { message: String },
}

impl NetworkError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed { .. } => true,
            NetworkError::Timeout { .. } => true,
            NetworkError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            NetworkError::InvalidResponse { .. } => false,
            NetworkError::Other { .. } => false,
        }
    }

    /// HTTP status, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { url, .. } => {
                format!("Unable to reach the agent backend at '{}'.", url)
            }
            NetworkError::Timeout { operation } => {
                format!("The {} request timed out.", operation)
            }
            NetworkError::HttpStatus { status, .. } => match *status {
                401 | 403 => "The backend rejected the API key.".to_string(),
                404 => "The session was not found on the backend.".to_string(),
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                500..=599 => "The backend is experiencing issues. Please try again later.".to_string(),
                _ => format!("The backend returned an error (HTTP {}).", status),
            },
            NetworkError::InvalidResponse { .. } => {
                "Received an invalid response from the backend.".to_string()
            }
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::InvalidResponse { .. } => "E_NET_INVALID",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { operation } => write!(f, "{} timed out", operation),
            NetworkError::HttpStatus { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            NetworkError::InvalidResponse { message } => {
                write!(f, "Invalid response: {}", message)
            }
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Classify a transport error for the request to `url`.
pub fn classify_http_error(err: &HttpError, url: &str) -> NetworkError {
    match err {
        HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
            url: url.to_string(),
            message: message.clone(),
        },
        HttpError::Timeout(_) => NetworkError::Timeout {
            operation: url.to_string(),
        },
        HttpError::ServerError { status, message } => NetworkError::HttpStatus {
            status: *status,
            message: message.clone(),
        },
        HttpError::InvalidUrl(message) => NetworkError::ConnectionFailed {
            url: url.to_string(),
            message: message.clone(),
        },
        HttpError::Io(message) | HttpError::Other(message) => NetworkError::Other {
            message: message.clone(),
        },
    }
}
