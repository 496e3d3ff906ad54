//! # Error Module
//!
//! Error types for the face blurring pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - every per-file error names the file
//! - **Fatal vs. recoverable** - `ScanError` variants for the roots halt a run,
//!   `TaskError` never leaves the task that produced it

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum FaceBlurError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Image error: {0}")]
    Task(#[from] TaskError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while walking the source tree and mirroring it
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Cannot create destination root {path}: {source}")]
    DestinationRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {path} through: {source}")]
    CopyThrough {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {reason}")]
    ReadDirectory { path: PathBuf, reason: String },

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),
}

impl ScanError {
    /// Whether this error stops the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::SourceNotFound { .. }
                | ScanError::DestinationRoot { .. }
                | ScanError::ThreadPool(_)
        )
    }
}

/// Errors confined to a single image
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Face detection failed for {path}: {reason}")]
    Detection { path: PathBuf, reason: String },

    #[error("Failed to encode image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Cannot write {path}: {source}")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    /// Whether the failure happened while writing the output
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            TaskError::Encode { .. } | TaskError::DestinationUnwritable { .. } | TaskError::Copy { .. }
        )
    }
}

/// Failure reported by a face detector backend
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DetectionError(pub String);

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, FaceBlurError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_not_found_includes_path() {
        let error = ScanError::SourceNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        assert!(error.to_string().contains("/photos/vacation"));
        assert!(error.is_fatal());
    }

    #[test]
    fn directory_create_is_not_fatal() {
        let error = ScanError::DirectoryCreate {
            path: PathBuf::from("/out/a"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!error.is_fatal());
        assert!(error.to_string().contains("/out/a"));
    }

    #[test]
    fn decode_error_includes_path_and_reason() {
        let error = TaskError::Decode {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
        assert!(!error.is_write_failure());
    }

    #[test]
    fn encode_error_is_write_failure() {
        let error = TaskError::Encode {
            path: PathBuf::from("/out/a.jpg"),
            reason: "disk full".to_string(),
        };
        assert!(error.is_write_failure());
    }
}
