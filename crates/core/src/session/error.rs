//! Error types for sessions.

use thiserror::Error;
use uuid::Uuid;

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::scan::ScanError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Invalid session settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid scanner configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}
