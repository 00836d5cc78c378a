//! HTTP client trait abstraction.
//!
//! The engine only needs three shapes of request against the agent backend:
//! a plain GET (session log), a plain POST (cancel, single-shot send) and a
//! streaming POST (`/wunder` SSE body). Tests plug in a mock.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// Request or response headers, name to value.
pub type Headers = HashMap<String, String>;

/// Response body delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// A fully read response. Any status is representable.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            body,
            ..Self::default()
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy on invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Transport-level failure. A non-2xx answer is only an error on
/// [`HttpClient::post_stream`].
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Could not connect to the host
    ConnectionFailed(String),
    Timeout(String),
    /// Non-2xx status on a streaming request
    ServerError { status: u16, message: String },
    /// The body failed mid-read
    Io(String),
    /// The request could not be built
    InvalidUrl(String),
    Other(String),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "timed out: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "backend returned {}: {}", status, message)
            }
            HttpError::Io(msg) => write!(f, "body read failed: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "invalid request: {}", msg),
            HttpError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP client operations.
///
/// `get` and `post` return any status as a [`Response`]; only transport
/// failures are errors. `post_stream` instead fails with
/// [`HttpError::ServerError`] on a non-2xx status, since a failed stream has
/// no body worth reading incrementally.
///
/// ```ignore
/// use debugscope::traits::{Headers, HttpClient};
///
/// async fn status_of<C: HttpClient>(client: &C, url: &str) -> Option<u16> {
///     client.get(url, &Headers::new()).await.ok().map(|r| r.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// POST and return the body as a byte stream (used for SSE).
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_success() {
        assert!(Response::new(200, Bytes::new()).is_success());
        assert!(Response::new(204, Bytes::new()).is_success());
        assert!(!Response::new(404, Bytes::new()).is_success());
        assert!(!Response::new(500, Bytes::new()).is_success());
    }

    #[test]
    fn test_response_json() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Summary {
            session_id: String,
            status: String,
        }

        let response = Response::new(
            200,
            Bytes::from(r#"{"session_id":"s1","status":"running"}"#),
        );
        let summary: Summary = response.json().unwrap();
        assert_eq!(summary.session_id, "s1");
        assert_eq!(summary.status, "running");
    }

    #[test]
    fn test_text_lossy() {
        let response = Response::new(500, Bytes::from_static(b"bad \xff gateway"));
        assert!(response.text_lossy().starts_with("bad "));
    }

    #[test]
    fn test_http_error_display_and_status() {
        let err = HttpError::ServerError {
            status: 404,
            message: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 404: missing");
        assert_eq!(err.status(), Some(404));
        let timeout = HttpError::Timeout("30s".to_string());
        assert_eq!(timeout.status(), None);
        assert_eq!(timeout.to_string(), "timed out: 30s");
    }
}
