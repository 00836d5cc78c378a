//! Session id storage abstraction.
//!
//! The last active session id survives restarts so a debug panel can be
//! restored by replaying the backend's log.

use crate::error::SystemError;

/// Persistent slot for the active session id.
pub trait SessionStore: Send + Sync {
    /// Load the stored session id, if any. Unreadable storage counts as empty.
    fn load(&self) -> Option<String>;

    /// Persist the session id, replacing any previous one.
    fn persist(&self, session_id: &str) -> Result<(), SystemError>;

    /// Forget the stored session id.
    fn clear(&self) -> Result<(), SystemError>;
}
