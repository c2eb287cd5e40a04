//! Mock sensors and preview source for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::hardware::{
    DetectionResult, HardwareError, LightSensor, PreviewImage, PreviewSource, Sample,
    VisionSensor,
};

/// Light sensor replaying a fixed list of samples.
///
/// Once the script runs out the last sample repeats, like a sensor staring at
/// the end of the roll.
#[derive(Debug, Clone)]
pub struct ScriptedLightSensor {
    samples: Arc<RwLock<VecDeque<Sample>>>,
    last: Arc<RwLock<Sample>>,
    reads: Arc<RwLock<usize>>,
}

impl ScriptedLightSensor {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: Arc::new(RwLock::new(samples.into())),
            last: Arc::new(RwLock::new(Sample::default())),
            reads: Arc::new(RwLock::new(0)),
        }
    }

    /// Script with the same value on both channels.
    pub fn from_values(values: &[i64]) -> Self {
        Self::new(values.iter().map(|&v| Sample::new(v, v)).collect())
    }

    /// Number of measurements taken so far.
    pub async fn read_count(&self) -> usize {
        *self.reads.read().await
    }
}

#[async_trait]
impl LightSensor for ScriptedLightSensor {
    async fn measure(&self) -> Result<Sample, HardwareError> {
        *self.reads.write().await += 1;
        let next = self.samples.write().await.pop_front();
        let mut last = self.last.write().await;
        if let Some(sample) = next {
            *last = sample;
        }
        Ok(*last)
    }
}

/// Vision sensor returning one scripted detection list per inference.
///
/// Returns no detections after the script runs out.
#[derive(Debug, Clone)]
pub struct MockVisionSensor {
    frames: Arc<RwLock<VecDeque<Vec<DetectionResult>>>>,
    inferences: Arc<RwLock<usize>>,
}

impl MockVisionSensor {
    pub fn new(frames: Vec<Vec<DetectionResult>>) -> Self {
        Self {
            frames: Arc::new(RwLock::new(frames.into())),
            inferences: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn inference_count(&self) -> usize {
        *self.inferences.read().await
    }
}

#[async_trait]
impl VisionSensor for MockVisionSensor {
    async fn infer(&self, _image: &PreviewImage) -> Result<Vec<DetectionResult>, HardwareError> {
        *self.inferences.write().await += 1;
        Ok(self.frames.write().await.pop_front().unwrap_or_default())
    }
}

/// Preview source producing an empty image.
#[derive(Debug, Clone, Default)]
pub struct MockPreviewSource {
    previews: Arc<RwLock<usize>>,
}

impl MockPreviewSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn preview_count(&self) -> usize {
        *self.previews.read().await
    }
}

#[async_trait]
impl PreviewSource for MockPreviewSource {
    async fn capture_preview(&self) -> Result<PreviewImage, HardwareError> {
        *self.previews.write().await += 1;
        Ok(PreviewImage::new(Vec::new()))
    }
}
