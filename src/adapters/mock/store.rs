//! In-memory session store for testing.

use std::sync::Mutex;

use crate::error::SystemError;
use crate::traits::SessionStore;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session_id: Mutex<Option<String>>,
    /// Fail every persist with this message
    fail_persist: Mutex<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: &str) -> Self {
        Self {
            session_id: Mutex::new(Some(session_id.to_string())),
            ..Self::default()
        }
    }

    /// Make subsequent persists fail.
    pub fn fail_persist(&self, message: &str) {
        *self.fail_persist.lock().unwrap() = Some(message.to_string());
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Option<String> {
        self.session_id.lock().unwrap().clone()
    }

    fn persist(&self, session_id: &str) -> Result<(), SystemError> {
        if let Some(message) = self.fail_persist.lock().unwrap().clone() {
            return Err(SystemError::IoError {
                operation: "persist session id".to_string(),
                path: None,
                message,
            });
        }
        *self.session_id.lock().unwrap() = Some(session_id.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SystemError> {
        *self.session_id.lock().unwrap() = None;
        Ok(())
    }
}
