//! Error types shared across the library
//!
//! Only genuine collaborator failures are errors. Expected outcomes such as a
//! missing executable or an app that is already running are recorded as data
//! in a `RunResult` instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitWindowError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to enumerate processes: {0}")]
    ProcessList(String),

    #[error("Failed to start {path}: {reason}")]
    ProcessStart { path: PathBuf, reason: String },

    #[error("Icon extraction failed for {path}: {reason}")]
    IconExtraction { path: PathBuf, reason: String },

    #[error("Login item error: {0}")]
    LoginItem(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),
}

impl InitWindowError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = InitWindowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = InitWindowError::io(
            "C:\\data\\data.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("data.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_process_start_message() {
        let err = InitWindowError::ProcessStart {
            path: PathBuf::from("C:\\App\\app.exe"),
            reason: "access denied".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to start C:\\App\\app.exe: access denied");
    }
}
