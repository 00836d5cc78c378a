//! System-related error types.
//!
//! Only the file-backed session store touches the filesystem.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum SystemError {
    /// Could not determine home directory.
    NoHomeDirectory,

    /// Permission denied for file/directory operation.
    PermissionDenied { path: PathBuf, operation: String },

    /// Generic I/O error.
    IoError {
        operation: String,
        path: Option<PathBuf>,
        message: String,
    },
}

impl SystemError {
    pub fn user_message(&self) -> String {
        match self {
            SystemError::NoHomeDirectory => {
                "Could not determine your home directory for the session store.".to_string()
            }
            SystemError::PermissionDenied { path, operation } => {
                format!("Permission denied: cannot {} '{}'.", operation, path.display())
            }
            SystemError::IoError {
                operation, path, ..
            } => match path {
                Some(p) => format!("Failed to {} '{}'.", operation, p.display()),
                None => format!("Failed to {}.", operation),
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SystemError::NoHomeDirectory => "E_SYS_NO_HOME",
            SystemError::PermissionDenied { .. } => "E_SYS_PERM",
            SystemError::IoError { .. } => "E_SYS_IO",
        }
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::NoHomeDirectory => write!(f, "Home directory not found"),
            SystemError::PermissionDenied { path, operation } => {
                write!(f, "Permission denied ({}) for '{}'", operation, path.display())
            }
            SystemError::IoError {
                operation,
                path,
                message,
            } => match path {
                Some(p) => write!(f, "I/O error during {} on '{}': {}", operation, p.display(), message),
                None => write!(f, "I/O error during {}: {}", operation, message),
            },
        }
    }
}

impl std::error::Error for SystemError {}

/// Classify an I/O error for the given path and operation.
pub fn classify_io_error(err: io::Error, path: Option<PathBuf>, operation: &str) -> SystemError {
    match (err.kind(), path) {
        (io::ErrorKind::PermissionDenied, Some(path)) => SystemError::PermissionDenied {
            path,
            operation: operation.to_string(),
        },
        (_, path) => SystemError::IoError {
            operation: operation.to_string(),
            path,
            message: err.to_string(),
        },
    }
}
