//! Error types for the pipeline module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while tagging or archiving a file.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The tagger rejected the file.
    #[error("Failed to tag {path}: {reason}")]
    TagFailed { path: PathBuf, reason: String },

    /// Failed to create destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to copy file across filesystems.
    #[error("Failed to copy file from {from} to {to}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to move/rename file.
    #[error("Failed to move file from {from} to {to}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Creates a tag failed error.
    pub fn tag_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TagFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a move failed error.
    pub fn move_failed(from: PathBuf, to: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed { from, to, error }
    }
}
