//! Error types for hardware collaborators.

use thiserror::Error;

/// Errors reported by motor, sensor, lamp and camera drivers.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("Motor error: {0}")]
    Motor(String),

    #[error("Light sensor error: {0}")]
    Sensor(String),

    #[error("Vision inference error: {0}")]
    Vision(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Lamp error: {0}")]
    Lamp(String),

    /// The device was used before it was initialized, or after it was released.
    #[error("Device not connected: {0}")]
    NotConnected(String),

    #[error("Camera does not expose setting '{0}'")]
    UnsupportedSetting(String),
}

impl HardwareError {
    /// Whether the error came from the camera side of the rig.
    pub fn is_camera(&self) -> bool {
        matches!(
            self,
            Self::Camera(_) | Self::NotConnected(_) | Self::UnsupportedSetting(_)
        )
    }
}
