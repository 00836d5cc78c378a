//! Result type alias for debug engine operations.

use super::debug_error::DebugError;

/// Type alias for Results using DebugError.
///
/// ```ignore
/// use debugscope::error::DebugResult;
///
/// fn load_config() -> DebugResult<DebugConfig> {
///     DebugConfig::from_env()
/// }
/// ```
pub type DebugResult<T> = Result<T, DebugError>;
