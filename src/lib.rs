//! debugscope - debug-session event reconciliation for LLM agent runs
//!
//! Consumes the execution events of one agent run, live over SSE or replayed
//! from the backend's persisted log, and derives per-round model metrics,
//! request/response pairing and cumulative token statistics.
//!
//! # Modules
//! - `sse` - SSE framing of the raw response body
//! - `events` - Event kinds, records and envelope decoding
//! - `engine` - Per-session state: rounds, pending requests, stats (DebugContext)
//! - `replay` - Full and cursor-resumed replay of the session log
//! - `stream` - Live stream controller and poll scheduler
//! - `client` - Typed backend API client
//! - `render` - Channel and console renderers
//! - `traits` / `adapters` - Injection seams and their implementations

pub mod adapters;
pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod render;
pub mod replay;
pub mod sse;
pub mod stream;
pub mod traits;

pub use engine::{DebugContext, MetricsView};
pub use error::{DebugError, DebugResult};
pub use events::{EventKind, EventRecord};
