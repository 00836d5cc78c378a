//! Agent backend API client.
//!
//! Thin typed layer over an [`HttpClient`]: it knows the backend's routes
//! and payload shapes, and turns transport results into [`ClientError`].
//!
//! | Operation | Route |
//! |-----------|-------|
//! | `open_stream` | `POST /wunder` (`stream: true`, SSE body) |
//! | `send` | `POST /wunder` (`stream: false`, JSON body) |
//! | `fetch_session_log` | `GET /wunder/admin/monitor/{id}` |
//! | `cancel` | `POST /wunder/admin/monitor/{id}/cancel` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::engine::SessionStatus;
use crate::error::{classify_http_error, NetworkError, ReplayError, StreamError};
use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_USER_ID: &str = "admin";

/// Error type for backend API operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status(),
            ClientError::Json(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn to_network_error(&self, url: &str) -> NetworkError {
        match self {
            ClientError::Transport(err) => classify_http_error(err, url),
            ClientError::Status { status, message } => NetworkError::HttpStatus {
                status: *status,
                message: message.clone(),
            },
            ClientError::Json(err) => NetworkError::InvalidResponse {
                message: err.to_string(),
            },
        }
    }

    /// Classify a failed log fetch for `session_id`.
    pub fn to_replay_error(&self, session_id: &str) -> ReplayError {
        match self {
            _ if self.is_not_found() => ReplayError::NotFound {
                session_id: session_id.to_string(),
            },
            ClientError::Json(err) => ReplayError::InvalidLog {
                message: err.to_string(),
            },
            _ => ReplayError::Transient {
                source: self.to_network_error(session_id),
            },
        }
    }

    /// Classify a failure opening the live stream.
    pub fn to_stream_error(&self) -> StreamError {
        match self {
            ClientError::Status { status, message } => StreamError::ServerStatus {
                status: *status,
                message: message.clone(),
            },
            ClientError::Transport(HttpError::ServerError { status, message }) => {
                StreamError::ServerStatus {
                    status: *status,
                    message: message.clone(),
                }
            }
            other => StreamError::OpenFailed {
                message: other.to_string(),
            },
        }
    }
}

/// Body of a `/wunder` run request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub user_id: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub stream: bool,
    pub debug: bool,
}

impl StreamRequest {
    pub fn new(user_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            question: question.into(),
            session_id: None,
            stream: true,
            debug: true,
        }
    }

    /// Continue an existing session.
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Session header of a persisted log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Fields the engine does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Persisted session log: `{ session, events }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    #[serde(default)]
    pub session: SessionSummary,
    #[serde(default)]
    pub events: Vec<Value>,
}

/// Client for the agent backend.
#[derive(Clone)]
pub struct DebugApiClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: Option<String>,
    user_id: String,
}

impl std::fmt::Debug for DebugApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugApiClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl DebugApiClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Streaming run request for `question` as the configured user.
    pub fn request(&self, question: &str) -> StreamRequest {
        StreamRequest::new(self.user_id.clone(), question)
    }

    pub fn run_url(&self) -> String {
        format!("{}/wunder", self.base_url)
    }

    pub fn session_log_url(&self, session_id: &str) -> String {
        format!(
            "{}/wunder/admin/monitor/{}",
            self.base_url,
            urlencoding::encode(session_id)
        )
    }

    pub fn cancel_url(&self, session_id: &str) -> String {
        format!("{}/cancel", self.session_log_url(session_id))
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(key) = &self.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {}", key));
        }
        headers
    }

    fn check_status(response: Response) -> Result<Response, ClientError> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                status: response.status,
                message: response.text_lossy(),
            })
        }
    }

    /// Open a live run. The returned body is raw SSE bytes.
    pub async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError> {
        let mut request = request.clone();
        request.stream = true;
        let body = serde_json::to_string(&request)?;
        let stream = self
            .http
            .post_stream(&self.run_url(), &body, &self.headers())
            .await?;
        Ok(stream)
    }

    /// Single-shot run. Returns the backend's JSON answer.
    pub async fn send(&self, request: &StreamRequest) -> Result<Value, ClientError> {
        let mut request = request.clone();
        request.stream = false;
        let body = serde_json::to_string(&request)?;
        let response = self
            .http
            .post(&self.run_url(), &body, &self.headers())
            .await?;
        Ok(Self::check_status(response)?.json()?)
    }

    /// Fetch the persisted log of a session.
    pub async fn fetch_session_log(&self, session_id: &str) -> Result<SessionLog, ClientError> {
        let response = self
            .http
            .get(&self.session_log_url(session_id), &self.headers())
            .await?;
        Ok(Self::check_status(response)?.json()?)
    }

    /// Ask the backend to cancel a running session.
    pub async fn cancel(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(&self.cancel_url(session_id), "{}", &self.headers())
            .await?;
        Self::check_status(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use bytes::Bytes;
    use serde_json::json;

    fn client(mock: &MockHttpClient) -> DebugApiClient {
        DebugApiClient::new(Arc::new(mock.clone()), "http://backend/")
            .with_api_key(Some("k".to_string()))
    }

    #[test]
    fn test_urls() {
        let api = client(&MockHttpClient::new());
        assert_eq!(api.run_url(), "http://backend/wunder");
        assert_eq!(
            api.session_log_url("a b/c"),
            "http://backend/wunder/admin/monitor/a%20b%2Fc"
        );
        assert_eq!(
            api.cancel_url("s1"),
            "http://backend/wunder/admin/monitor/s1/cancel"
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = StreamRequest::new("admin", "hi");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], json!(true));
        assert!(value.get("session_id").is_none());

        let value =
            serde_json::to_value(request.with_session_id(Some("s1".to_string()))).unwrap();
        assert_eq!(value["session_id"], json!("s1"));
    }

    #[tokio::test]
    async fn test_fetch_session_log() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend/wunder/admin/monitor/s1",
            MockResponse::json(
                200,
                &json!({
                    "session": {"session_id": "s1", "status": "running", "model": "m"},
                    "events": [{"type": "progress", "data": {}}]
                }),
            ),
        );

        let log = client(&mock).fetch_session_log("s1").await.unwrap();
        assert_eq!(log.session.status, SessionStatus::Running);
        assert_eq!(log.session.extra.get("model"), Some(&json!("m")));
        assert_eq!(log.events.len(), 1);

        let sent = &mock.get_requests()[0];
        assert_eq!(
            sent.headers.get("Authorization"),
            Some(&"Bearer k".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let mock = MockHttpClient::new();
        mock.set_default_response(MockResponse::Success(Response::new(
            404,
            Bytes::from("no such session"),
        )));

        let err = client(&mock).fetch_session_log("gone").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_replay_error("gone").is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_is_transient() {
        let mock = MockHttpClient::new();
        mock.set_default_response(MockResponse::Error(HttpError::ConnectionFailed(
            "refused".to_string(),
        )));

        let err = client(&mock).fetch_session_log("s1").await.unwrap_err();
        assert!(matches!(
            err.to_replay_error("s1"),
            ReplayError::Transient { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_log_body() {
        let mock = MockHttpClient::new();
        mock.set_default_response(MockResponse::Success(Response::new(
            200,
            Bytes::from("<html>"),
        )));
        let err = client(&mock).fetch_session_log("s1").await.unwrap_err();
        assert!(matches!(
            err.to_replay_error("s1"),
            ReplayError::InvalidLog { .. }
        ));
    }

    #[tokio::test]
    async fn test_send_forces_non_streaming() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://backend/wunder",
            MockResponse::json(200, &json!({"answer": "ok"})),
        );
        let api = client(&mock);
        let answer = api.send(&api.request("q")).await.unwrap();
        assert_eq!(answer["answer"], json!("ok"));
        let body = mock.get_requests()[0].json_body().unwrap();
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["user_id"], json!("admin"));
    }

    #[tokio::test]
    async fn test_open_stream_server_error() {
        let mock = MockHttpClient::new();
        mock.set_default_response(MockResponse::Success(Response::new(
            500,
            Bytes::from("down"),
        )));
        let api = client(&mock);
        let err = match api.open_stream(&api.request("q")).await {
            Err(err) => err,
            Ok(_) => panic!("expected failure"),
        };
        assert_eq!(err.status(), Some(500));
        assert!(matches!(
            err.to_stream_error(),
            StreamError::ServerStatus { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_cancel() {
        let mock = MockHttpClient::new();
        mock.set_default_response(MockResponse::json(200, &json!({"ok": true})));
        client(&mock).cancel("s1").await.unwrap();
        assert_eq!(mock.requests_to("/s1/cancel").len(), 1);
    }
}
