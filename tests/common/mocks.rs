//! Mock configurations for integration tests.

pub use debugscope::adapters::mock::{
    InMemorySessionStore, MockHttpClient, MockResponse, RecordingRenderer,
};

use serde_json::Value;

/// Base URL every mocked client is pointed at.
#[allow(dead_code)]
pub const BASE_URL: &str = "http://backend";

/// Builder for scripting a [`MockHttpClient`].
#[allow(dead_code)]
pub struct MockHttpConfig {
    client: MockHttpClient,
}

#[allow(dead_code)]
impl MockHttpConfig {
    pub fn new() -> Self {
        Self {
            client: MockHttpClient::new(),
        }
    }

    /// Always answer the run endpoint with these SSE chunks.
    pub fn with_stream<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.client
            .set_response(&run_url(), MockResponse::sse(chunks));
        self
    }

    /// Queue one log response for `session_id`. The last queued one repeats.
    pub fn with_log(self, session_id: &str, log: &Value) -> Self {
        self.client
            .push_response(&log_url(session_id), MockResponse::json(200, log));
        self
    }

    pub fn with_status(self, url: &str, status: u16, body: &Value) -> Self {
        self.client
            .set_response(url, MockResponse::json(status, body));
        self
    }

    pub fn build(self) -> MockHttpClient {
        self.client
    }
}

impl Default for MockHttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
pub fn run_url() -> String {
    format!("{}/wunder", BASE_URL)
}

#[allow(dead_code)]
pub fn log_url(session_id: &str) -> String {
    format!("{}/wunder/admin/monitor/{}", BASE_URL, session_id)
}
