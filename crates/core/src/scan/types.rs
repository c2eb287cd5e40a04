use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::capture::CaptureError;
use crate::hardware::{Lamp, LightSensor, MotorDriver, PreviewSource, VisionSensor};

/// Normalized `(x1, y1, x2, y2)` crop inside the frame, each in 0..1.
pub type Crop = (f32, f32, f32, f32);

/// A frame ready to be photographed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoInfo {
    pub index: u32,
    pub crop: Option<Crop>,
}

impl PhotoInfo {
    pub fn new(index: u32) -> Self {
        Self { index, crop: None }
    }

    pub fn with_crop(mut self, crop: Crop) -> Self {
        self.crop = Some(crop);
        self
    }
}

/// What a scan loop is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Whole frames, for photographing.
    Frames,
    /// Individual holes, for skipping ahead. Illuminance only.
    Holes,
}

/// One item of a scan loop's sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameEvent {
    Photo(PhotoInfo),
    /// Running hole count since the loop started.
    Hole(u32),
}

/// Lifecycle of a [`super::ScanController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Active,
    Scanning,
    /// Terminal.
    Stopped,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Scanning)
    }
}

/// Signals sent from the controller to whoever orchestrates the session.
#[derive(Debug)]
pub enum ScanSignal {
    SessionStarted,
    SessionStopped,
    /// A frame sits in the gate. The scan resumes once `captured` is answered.
    NextPhoto {
        info: PhotoInfo,
        captured: oneshot::Sender<Result<(), CaptureError>>,
    },
    ScanFinished {
        count: u32,
    },
    HolesSkipped {
        count: u32,
    },
}

/// Devices available to a scan.
///
/// Which ones are required depends on the detection strategy: the light sensor
/// for illuminance, the vision sensor and a preview source for vision.
#[derive(Clone, Default)]
pub struct ScanRig {
    pub motor: Option<Arc<dyn MotorDriver>>,
    pub light_sensor: Option<Arc<dyn LightSensor>>,
    pub vision_sensor: Option<Arc<dyn VisionSensor>>,
    pub preview: Option<Arc<dyn PreviewSource>>,
    pub backlight: Option<Arc<dyn Lamp>>,
    pub sensor_lamp: Option<Arc<dyn Lamp>>,
}

impl ScanRig {
    pub fn new(motor: Arc<dyn MotorDriver>) -> Self {
        Self {
            motor: Some(motor),
            ..Default::default()
        }
    }

    pub fn with_light_sensor(mut self, sensor: Arc<dyn LightSensor>) -> Self {
        self.light_sensor = Some(sensor);
        self
    }

    pub fn with_vision_sensor(mut self, sensor: Arc<dyn VisionSensor>) -> Self {
        self.vision_sensor = Some(sensor);
        self
    }

    pub fn with_preview(mut self, preview: Arc<dyn PreviewSource>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_backlight(mut self, lamp: Arc<dyn Lamp>) -> Self {
        self.backlight = Some(lamp);
        self
    }

    pub fn with_sensor_lamp(mut self, lamp: Arc<dyn Lamp>) -> Self {
        self.sensor_lamp = Some(lamp);
        self
    }
}

impl fmt::Debug for ScanRig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRig")
            .field("motor", &self.motor.is_some())
            .field("light_sensor", &self.light_sensor.is_some())
            .field("vision_sensor", &self.vision_sensor.is_some())
            .field("preview", &self.preview.is_some())
            .field("backlight", &self.backlight.is_some())
            .field("sensor_lamp", &self.sensor_lamp.is_some())
            .finish()
    }
}
