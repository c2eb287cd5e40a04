//! Frame boundary detection.
//!
//! Two strategies share one [`FrameDetector`] type: counting sprocket holes
//! from the light sensor waveform, or running object detection over camera
//! previews.

mod illuminance;
mod vision;
mod window;

pub use illuminance::{HoleSignal, IlluminanceDetector};
pub use vision::{VisionDetector, VisionObservation, VisionSignal};
pub use window::SlidingWindow;

use crate::config::{DetectionStrategy, ScannerConfig};

/// Detector selected when a scan loop is built.
#[derive(Debug)]
pub enum FrameDetector {
    Illuminance(IlluminanceDetector),
    Vision(VisionDetector),
}

impl FrameDetector {
    /// Fresh detector for the configured strategy.
    pub fn from_config(config: &ScannerConfig) -> Self {
        match config.scan.strategy {
            DetectionStrategy::Illuminance => {
                FrameDetector::Illuminance(IlluminanceDetector::new(&config.illuminance))
            }
            DetectionStrategy::Vision => FrameDetector::Vision(VisionDetector::new(&config.vision)),
        }
    }

    pub fn strategy(&self) -> DetectionStrategy {
        match self {
            FrameDetector::Illuminance(_) => DetectionStrategy::Illuminance,
            FrameDetector::Vision(_) => DetectionStrategy::Vision,
        }
    }

    /// Motor steps to take before the next sample.
    pub fn step_size(&self) -> i32 {
        match self {
            FrameDetector::Illuminance(_) => 1,
            FrameDetector::Vision(v) => v.step_size(),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            FrameDetector::Illuminance(d) => d.is_finished(),
            FrameDetector::Vision(d) => d.is_finished(),
        }
    }
}
