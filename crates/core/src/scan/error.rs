//! Error types for scanning.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::hardware::HardwareError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The rig lacks a device the selected strategy needs.
    #[error("Scan rig has no {0}")]
    MissingHardware(&'static str),

    #[error("Hole skipping is not supported by the vision strategy")]
    HoleSkippingUnsupported,

    #[error("Session is not active")]
    SessionNotActive,

    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Nobody is listening for capture requests anymore.
    #[error("Session orchestrator is gone")]
    OrchestratorGone,
}
