//! Hardware abstractions consumed by the scanner core.
//!
//! Motor, sensors, lamps and the camera are all reached through async traits
//! so the detection and capture logic can run against real drivers or the
//! in-memory mocks in [`crate::testing`].

mod error;
mod traits;
mod types;

pub use error::HardwareError;
pub use traits::{CameraDevice, Lamp, LightSensor, MotorDriver, PreviewSource, VisionSensor};
pub use types::{
    BoundingBox, CameraEvent, CameraFilePath, CameraSetting, DetectionLabel, DetectionResult,
    LuxChannel, PreviewImage, Sample, SettingValue,
};
