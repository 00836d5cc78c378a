//! File-backed session store.
//!
//! The active session id is kept as a single line in
//! `~/.debugscope/session_id`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{classify_io_error, SystemError};
use crate::traits::SessionStore;

/// The store directory name.
const STORE_DIR: &str = ".debugscope";

/// The session id file name.
const SESSION_FILE: &str = "session_id";

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store under the user's home directory.
    pub fn new() -> Result<Self, SystemError> {
        let home = dirs::home_dir().ok_or(SystemError::NoHomeDirectory)?;
        Ok(Self::at(home.join(STORE_DIR).join(SESSION_FILE)))
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).ok()?;
        let id = content.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    fn persist(&self, session_id: &str) -> Result<(), SystemError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                classify_io_error(e, Some(parent.to_path_buf()), "create store directory")
            })?;
        }
        fs::write(&self.path, format!("{}\n", session_id))
            .map_err(|e| classify_io_error(e, Some(self.path.clone()), "write session id"))
    }

    fn clear(&self) -> Result<(), SystemError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(classify_io_error(
                e,
                Some(self.path.clone()),
                "remove session id",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileSessionStore {
        FileSessionStore::at(dir.path().join("nested").join(SESSION_FILE))
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load(), None);
    }

    #[test]
    fn test_persist_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.persist("sess-42").unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load(), Some("sess-42".to_string()));

        store.persist("sess-43").unwrap();
        assert_eq!(store.load(), Some("sess-43".to_string()));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.persist("s").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_blank_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.persist("  ").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_default_path() {
        if let Ok(store) = FileSessionStore::new() {
            assert!(store.path().ends_with(".debugscope/session_id"));
        }
    }
}
