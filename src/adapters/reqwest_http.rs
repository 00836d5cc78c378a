//! Reqwest-based HTTP client adapter.
//!
//! Plain requests carry a request timeout. Streaming requests only carry a
//! connect timeout, since an agent run can keep its SSE body open for
//! minutes.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// Default timeout for plain GET/POST requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout, shared by plain and streaming requests.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client implementation using reqwest.
///
/// ```ignore
/// use debugscope::adapters::ReqwestHttpClient;
/// use debugscope::traits::{Headers, HttpClient};
///
/// let client = ReqwestHttpClient::new();
/// let response = client.get("http://localhost:8000/wunder/admin/monitor/s1", &Headers::new()).await?;
/// println!("Status: {}", response.status);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Build a client with explicit timeouts.
    pub fn with_timeouts(request_timeout: Duration, connect_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            request_timeout,
        }
    }

    /// Wrap a preconfigured `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else if err.is_body() || err.is_decode() {
            HttpError::Io(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(builder, |builder, (key, value)| builder.header(key, value))
    }

    async fn read_response(response: reqwest::Response) -> Result<Response, HttpError> {
        let status = response.status().as_u16();
        let headers = Self::convert_headers(response.headers());
        let body = response.bytes().await.map_err(Self::convert_error)?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self.client.get(url).timeout(self.request_timeout);
        let response = Self::apply_headers(builder, headers)
            .send()
            .await
            .map_err(Self::convert_error)?;
        Self::read_response(response).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .body(body.to_string());
        let response = Self::apply_headers(builder, headers)
            .send()
            .await
            .map_err(Self::convert_error)?;
        Self::read_response(response).await
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let builder = self
            .client
            .post(url)
            .header("Accept", "text/event-stream")
            .body(body.to_string());
        let response = Self::apply_headers(builder, headers)
            .send()
            .await
            .map_err(Self::convert_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::ServerError { status, message });
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else {
                    HttpError::Io(e.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
