//! Test doubles for the trait abstractions.
//!
//! - [`MockHttpClient`] - Scripted HTTP responses and request recording
//! - [`RecordingRenderer`] - Captures every view event
//! - [`InMemorySessionStore`] - Session id slot without a filesystem

pub mod http;
pub mod renderer;
pub mod store;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use renderer::{LoggedEntry, LoggedRequest, RecordingRenderer, RenderLog};
pub use store::InMemorySessionStore;
