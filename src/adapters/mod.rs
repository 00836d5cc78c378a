//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`FileSessionStore`] - Session id file under `~/.debugscope`
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::RecordingRenderer`] - Captures rendered entries
//! - [`mock::InMemorySessionStore`] - In-memory session id storage

pub mod file_store;
pub mod mock;
pub mod reqwest_http;

pub use file_store::FileSessionStore;
pub use mock::{InMemorySessionStore, MockHttpClient, RecordingRenderer};
pub use reqwest_http::ReqwestHttpClient;
