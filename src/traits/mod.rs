//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, streaming)
//! - [`Renderer`] - Write-only sink for computed view events
//! - [`SessionStore`] - Persistent slot for the active session id

pub mod http;
pub mod renderer;
pub mod store;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
pub use renderer::{EntryHandle, EntryMeta, Renderer};
pub use store::SessionStore;
