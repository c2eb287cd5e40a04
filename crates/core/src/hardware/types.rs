//! Value types exchanged with hardware drivers.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One two-channel illuminance reading, taken once per motor step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub visible: i64,
    pub infrared: i64,
}

impl Sample {
    pub fn new(visible: i64, infrared: i64) -> Self {
        Self { visible, infrared }
    }
}

/// Which channel of a [`Sample`] feeds the illuminance detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuxChannel {
    #[default]
    Visible,
    Infrared,
}

impl LuxChannel {
    pub fn pick(&self, sample: Sample) -> i64 {
        match self {
            LuxChannel::Visible => sample.visible,
            LuxChannel::Infrared => sample.infrared,
        }
    }
}

/// Encoded live-view frame returned by the camera.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewImage {
    pub data: Vec<u8>,
}

impl PreviewImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Object classes the vision model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionLabel {
    Hole,
    Photo,
    PartialPhoto,
    Separator,
}

impl DetectionLabel {
    pub fn is_photo(&self) -> bool {
        matches!(self, DetectionLabel::Photo | DetectionLabel::PartialPhoto)
    }
}

/// Axis-aligned box in normalized image coordinates (0..1).
///
/// Corners are stored as reported by the model; accessors normalize ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn min_x(&self) -> f32 {
        self.x1.min(self.x2)
    }

    pub fn max_x(&self) -> f32 {
        self.x1.max(self.x2)
    }

    pub fn min_y(&self) -> f32 {
        self.y1.min(self.y2)
    }

    pub fn max_y(&self) -> f32 {
        self.y1.max(self.y2)
    }

    pub fn width(&self) -> f32 {
        self.max_x() - self.min_x()
    }

    pub fn height(&self) -> f32 {
        self.max_y() - self.min_y()
    }

    /// Fraction of the image covered by the box.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Normalized `(x1, y1, x2, y2)` with the smaller corner first.
    pub fn as_crop(&self) -> (f32, f32, f32, f32) {
        (self.min_x(), self.min_y(), self.max_x(), self.max_y())
    }
}

/// One labeled box produced by vision inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub label: DetectionLabel,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl DetectionResult {
    pub fn new(label: DetectionLabel, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            label,
            bbox,
            confidence,
        }
    }
}

/// Location of a file on the camera's storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraFilePath {
    pub folder: String,
    pub name: String,
}

impl CameraFilePath {
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }

    /// Where the file lands when downloaded into `dir`.
    pub fn local_path(&self, dir: &std::path::Path) -> PathBuf {
        dir.join(&self.name)
    }
}

impl fmt::Display for CameraFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder.trim_end_matches('/'), self.name)
    }
}

/// Notification drained from the camera's event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraEvent {
    /// Nothing arrived within the wait timeout.
    Timeout,
    FileAdded(CameraFilePath),
    FolderAdded(CameraFilePath),
    CaptureComplete,
    Unknown,
}

/// Exposure settings snapshotted on connect and restored on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraSetting {
    Iso,
    Aperture,
    ShutterSpeed,
    ExposureCompensation,
}

impl CameraSetting {
    pub const ALL: [CameraSetting; 4] = [
        CameraSetting::Iso,
        CameraSetting::Aperture,
        CameraSetting::ShutterSpeed,
        CameraSetting::ExposureCompensation,
    ];

    /// Name of the widget in the camera's configuration tree.
    pub fn config_name(&self) -> &'static str {
        match self {
            CameraSetting::Iso => "iso",
            CameraSetting::Aperture => "aperture",
            CameraSetting::ShutterSpeed => "shutterspeed",
            CameraSetting::ExposureCompensation => "exposurecompensation",
        }
    }
}

impl fmt::Display for CameraSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// Current value of a camera setting and the values the body accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingValue {
    pub current: String,
    pub choices: Vec<String>,
}

impl SettingValue {
    pub fn new(current: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            current: current.into(),
            choices,
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.choices.iter().any(|c| c == value)
    }
}
