//! SSE (Server-Sent Events) framing
//!
//! Splits the raw streaming body from the agent backend into frames.
//! SSE format consists of:
//! - `event: <type>` - event type line (defaults to `message`)
//! - `data: <json>` - data payload line, repeated lines joined with `\n`
//! - Empty line - signals end of frame
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - Frame and line types (SseFrame, SseLine)
//! - `parser` - Incremental parsing (SseFrameParser, parse_sse_line)

mod events;
mod parser;

// Re-export public types
pub use events::{SseFrame, SseLine, DEFAULT_EVENT_TYPE};
pub use parser::{parse_sse_line, SseFrameParser};
