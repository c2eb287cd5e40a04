//! Error types for the capture coordinator.

use thiserror::Error;

use crate::hardware::{CameraSetting, HardwareError};

/// Errors raised by [`super::CaptureCoordinator`].
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera is not connected")]
    NotConnected,

    /// Opening the camera or reading its initial settings failed.
    #[error("Failed to connect to camera: {source}")]
    Connect {
        #[source]
        source: HardwareError,
    },

    #[error("Capture failed: {0}")]
    Capture(#[source] HardwareError),

    #[error("Value '{value}' is not accepted for {setting}")]
    InvalidSettingValue {
        setting: CameraSetting,
        value: String,
    },

    #[error("Failed to apply {setting}: {source}")]
    Setting {
        setting: CameraSetting,
        #[source]
        source: HardwareError,
    },
}

impl CaptureError {
    pub fn connect(source: HardwareError) -> Self {
        Self::Connect { source }
    }

    pub fn setting(setting: CameraSetting, source: HardwareError) -> Self {
        Self::Setting { setting, source }
    }
}
