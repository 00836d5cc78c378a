//! Error handling for the debug engine.
//!
//! - **Error Categories**: High-level classification for handling decisions
//! - **Domain-specific Errors**: Network, Stream, Replay and System errors
//! - **Unified Error Type**: `DebugError` consolidates all error types
//! - **Result Type Alias**: `DebugResult<T>` for consistent return types
//!
//! Nothing here is fatal to the engine. Malformed frames are logged and
//! skipped, transport failures end one send, replay failures either drop
//! the session (not found) or leave state untouched (transient).
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, timeout | Yes |
//! | Server | Backend errors (5xx) | Yes |
//! | Client | Malformed backend data | No |
//! | User | Unknown session, bad input | No |
//! | System | Session store I/O | No |
//! | Configuration | Bad env values | No |

mod category;
mod debug_error;
mod network;
mod replay;
mod result;
mod stream;
mod system;

pub use category::ErrorCategory;
pub use debug_error::DebugError;
pub use network::{classify_http_error, NetworkError};
pub use replay::ReplayError;
pub use result::DebugResult;
pub use stream::StreamError;
pub use system::{classify_io_error, SystemError};
