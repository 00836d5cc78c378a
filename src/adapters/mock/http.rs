//! Mock HTTP client for testing.
//!
//! Responses are scripted per URL. A URL can hold a sequence of responses
//! (consumed in order, the last one repeats) so poll loops can observe a
//! session log growing over time.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    pub url: String,
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body.as_deref().and_then(|b| serde_json::from_str(b).ok())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a complete response (any status)
    Success(Response),
    /// Fail before any response
    Error(HttpError),
    /// Stream these chunks, then end
    Stream(Vec<Bytes>),
    /// Stream these chunks, then fail mid-read
    StreamThenError(Vec<Bytes>, HttpError),
    /// Stream these chunks, then hang until dropped
    StreamThenHang(Vec<Bytes>),
}

impl MockResponse {
    /// JSON body with the given status.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        MockResponse::Success(Response::new(status, Bytes::from(body.to_string())))
    }

    /// SSE body split into one chunk per string.
    pub fn sse<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(
            chunks
                .into_iter()
                .map(|c| Bytes::from(c.into()))
                .collect(),
        )
    }
}

/// Mock HTTP client for testing.
///
/// ```ignore
/// use debugscope::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.set_response(
///     "http://backend/wunder/admin/monitor/s1",
///     MockResponse::json(200, &serde_json::json!({"session": {}, "events": []})),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Scripted responses by exact URL
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Response when no URL matches
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the script for `url` with a single repeating response.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), VecDeque::from([response]));
    }

    /// Append a response to the script for `url`.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose URL ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<RecordedRequest> {
        self.get_requests()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    /// Next scripted response for a URL. The last entry of a script repeats.
    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();
        if let Some(script) = responses.get_mut(url) {
            if script.len() > 1 {
                return script.pop_front();
            }
            if let Some(last) = script.front() {
                return Some(last.clone());
            }
        }
        self.default_response.lock().unwrap().clone()
    }

    fn plain(&self, url: &str) -> Result<Response, HttpError> {
        match self.next_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

fn chunk_stream(chunks: Vec<Bytes>) -> impl futures::Stream<Item = Result<Bytes, HttpError>> {
    stream::iter(chunks.into_iter().map(Ok))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.plain(url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.plain(url)
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));

        match self.next_response(url) {
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(chunk_stream(chunks))),
            Some(MockResponse::StreamThenError(chunks, err)) => Ok(Box::pin(
                chunk_stream(chunks).chain(stream::once(async move { Err(err) })),
            )),
            Some(MockResponse::StreamThenHang(chunks)) => {
                Ok(Box::pin(chunk_stream(chunks).chain(stream::pending())))
            }
            Some(MockResponse::Success(response)) if !response.is_success() => {
                Err(HttpError::ServerError {
                    status: response.status,
                    message: response.text_lossy(),
                })
            }
            Some(MockResponse::Success(response)) => {
                Ok(Box::pin(chunk_stream(vec![response.body])))
            }
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
