//! Trait definitions for hardware drivers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::error::HardwareError;
use super::types::{
    CameraEvent, CameraFilePath, CameraSetting, DetectionResult, PreviewImage, Sample,
    SettingValue,
};

/// Stepper motor that advances the film strip.
#[async_trait]
pub trait MotorDriver: Send + Sync {
    /// Rotates by `steps` (sign gives direction), waiting `step_delay` between steps.
    async fn rotate(&self, step_delay: Duration, steps: i32) -> Result<(), HardwareError>;

    /// Releases the coils.
    async fn stop(&self) -> Result<(), HardwareError>;
}

/// Two-channel illuminance sensor behind the film gate.
#[async_trait]
pub trait LightSensor: Send + Sync {
    async fn measure(&self) -> Result<Sample, HardwareError>;
}

/// Object-detection model run over preview frames.
#[async_trait]
pub trait VisionSensor: Send + Sync {
    async fn infer(&self, image: &PreviewImage) -> Result<Vec<DetectionResult>, HardwareError>;
}

/// On/off actuator: the backlight panel or the sensor LED.
#[async_trait]
pub trait Lamp: Send + Sync {
    async fn set(&self, on: bool) -> Result<(), HardwareError>;
}

/// Anything that can hand out a live-view frame.
///
/// Implemented by the capture coordinator so preview grabs share its device lock.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    async fn capture_preview(&self) -> Result<PreviewImage, HardwareError>;
}

/// Tethered camera body.
///
/// Implementations are not expected to be internally synchronized; callers
/// serialize access.
#[async_trait]
pub trait CameraDevice: Send {
    /// Opens the connection to the body.
    async fn init(&mut self) -> Result<(), HardwareError>;

    /// Releases the connection.
    async fn exit(&mut self) -> Result<(), HardwareError>;

    /// Triggers the shutter and returns the first file the body wrote.
    async fn capture(&mut self) -> Result<CameraFilePath, HardwareError>;

    async fn capture_preview(&mut self) -> Result<PreviewImage, HardwareError>;

    /// Copies `file` into `target_dir` and returns the local path.
    async fn download(
        &mut self,
        file: &CameraFilePath,
        target_dir: &Path,
    ) -> Result<PathBuf, HardwareError>;

    /// Removes `file` from the body's storage.
    async fn delete(&mut self, file: &CameraFilePath) -> Result<(), HardwareError>;

    /// Waits up to `timeout` for the next queued event. A zero timeout polls.
    async fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, HardwareError>;

    async fn read_setting(&mut self, setting: CameraSetting)
        -> Result<SettingValue, HardwareError>;

    async fn write_setting(
        &mut self,
        setting: CameraSetting,
        value: &str,
    ) -> Result<(), HardwareError>;
}
