//! Execution events and their decoding
//!
//! # Module structure
//! - `kind` - Event kind enumeration (EventKind)
//! - `record` - Decoded event (EventRecord)
//! - `decode` - Envelope normalisation for live frames and stored log entries
//! - `timestamp` - Lenient timestamp parsing

mod decode;
mod kind;
mod record;
mod timestamp;

pub use decode::{
    decode_frame, decode_stored, normalize, DecodeError, DecodeOptions, Normalized,
    MAX_ENVELOPE_DEPTH,
};
pub use kind::EventKind;
pub use record::{as_number, EventRecord};
pub use timestamp::{from_epoch_number, parse_timestamp, parse_timestamp_str};
