use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::cancel::CancelFlag;
use super::error::ScanError;
use super::types::{FrameEvent, PhotoInfo, ScanMode, ScanRig};
use crate::config::{DetectionStrategy, ScannerConfig};
use crate::detector::{FrameDetector, HoleSignal, VisionSignal};
use crate::hardware::{
    DetectionResult, LightSensor, LuxChannel, MotorDriver, PreviewSource, VisionSensor,
};
use crate::metrics;

enum Sampler {
    Light {
        sensor: Arc<dyn LightSensor>,
        channel: LuxChannel,
    },
    Vision {
        sensor: Arc<dyn VisionSensor>,
        preview: Arc<dyn PreviewSource>,
    },
}

enum Reading {
    Lux(i64),
    Detections(Vec<DetectionResult>),
}

impl Sampler {
    async fn sample(&self) -> Result<Reading, ScanError> {
        match self {
            Sampler::Light { sensor, channel } => {
                let sample = sensor.measure().await?;
                debug!(visible = sample.visible, infrared = sample.infrared, "Lux");
                Ok(Reading::Lux(channel.pick(sample)))
            }
            Sampler::Vision { sensor, preview } => {
                let image = preview.capture_preview().await?;
                Ok(Reading::Detections(sensor.infer(&image).await?))
            }
        }
    }
}

/// Lazy, finite walk through a roll.
///
/// Each call to [`next_event`](Self::next_event) checks for cancellation,
/// turns the motor by the detector's current stride, takes one reading and
/// feeds it to the detector until something worth reporting shows up. Once the
/// detector reports the end of the film, the flag is raised or an error
/// occurs, the loop is exhausted for good.
pub struct ScanLoop {
    motor: Arc<dyn MotorDriver>,
    sampler: Sampler,
    detector: FrameDetector,
    mode: ScanMode,
    cancel: CancelFlag,
    direction: i32,
    step_delay: Duration,
    holes_per_frame: u32,
    holes: u32,
    frames: u32,
    steps: u64,
    leading_frame_pending: bool,
    exhausted: bool,
}

impl ScanLoop {
    pub fn new(
        rig: &ScanRig,
        config: &ScannerConfig,
        mode: ScanMode,
        cancel: CancelFlag,
    ) -> Result<Self, ScanError> {
        let motor = rig.motor.clone().ok_or(ScanError::MissingHardware("motor"))?;

        let (sampler, step_delay) = match config.scan.strategy {
            DetectionStrategy::Illuminance => {
                let sensor = rig
                    .light_sensor
                    .clone()
                    .ok_or(ScanError::MissingHardware("light sensor"))?;
                let sampler = Sampler::Light {
                    sensor,
                    channel: config.illuminance.channel,
                };
                (sampler, config.illuminance.step_delay())
            }
            DetectionStrategy::Vision => {
                if mode == ScanMode::Holes {
                    return Err(ScanError::HoleSkippingUnsupported);
                }
                let sensor = rig
                    .vision_sensor
                    .clone()
                    .ok_or(ScanError::MissingHardware("vision sensor"))?;
                let preview = rig
                    .preview
                    .clone()
                    .ok_or(ScanError::MissingHardware("preview source"))?;
                (Sampler::Vision { sensor, preview }, config.vision.step_delay())
            }
        };

        let leading_frame_pending = mode == ScanMode::Frames
            && config.scan.strategy == DetectionStrategy::Illuminance
            && config.illuminance.capture_leading_frame;

        Ok(Self {
            motor,
            sampler,
            detector: FrameDetector::from_config(config),
            mode,
            cancel,
            direction: config.scan.direction,
            step_delay,
            holes_per_frame: config.illuminance.holes_per_frame.max(1),
            holes: 0,
            frames: 0,
            steps: 0,
            leading_frame_pending,
            exhausted: false,
        })
    }

    /// Next frame event, or `None` once the roll is done.
    pub async fn next_event(&mut self) -> Result<Option<FrameEvent>, ScanError> {
        if self.exhausted {
            return Ok(None);
        }

        if self.leading_frame_pending {
            self.leading_frame_pending = false;
            return Ok(Some(FrameEvent::Photo(PhotoInfo::new(0))));
        }

        let result = self.advance().await;
        if !matches!(result, Ok(Some(_))) {
            self.exhausted = true;
        }
        result
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Motor steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn holes(&self) -> u32 {
        self.holes
    }

    async fn advance(&mut self) -> Result<Option<FrameEvent>, ScanError> {
        loop {
            if self.cancel.is_cancelled() {
                info!(steps = self.steps, "Scan cancelled");
                return Ok(None);
            }

            let stride = self.detector.step_size();
            self.motor
                .rotate(self.step_delay, self.direction * stride)
                .await?;
            self.steps += stride.unsigned_abs() as u64;

            let reading = self.sampler.sample().await?;
            if let Some(event) = self.interpret(reading) {
                return Ok(event);
            }
        }
    }

    /// `None` keeps stepping, `Some(None)` ends the roll.
    fn interpret(&mut self, reading: Reading) -> Option<Option<FrameEvent>> {
        match (&mut self.detector, reading) {
            (FrameDetector::Illuminance(detector), Reading::Lux(value)) => {
                match detector.push(value) {
                    HoleSignal::Finished => {
                        info!(holes = self.holes, steps = self.steps, "No more holes");
                        Some(None)
                    }
                    HoleSignal::NewHole => {
                        self.holes += 1;
                        metrics::HOLES_DETECTED.inc();
                        match self.mode {
                            ScanMode::Holes => Some(Some(FrameEvent::Hole(self.holes))),
                            ScanMode::Frames => {
                                let remaining = self.holes % self.holes_per_frame;
                                debug!(hole = self.holes, remaining, "Hole");
                                if remaining == 0 {
                                    self.frames += 1;
                                    metrics::FRAMES_DETECTED
                                        .with_label_values(&["illuminance"])
                                        .inc();
                                    let index = self.holes / self.holes_per_frame;
                                    Some(Some(FrameEvent::Photo(PhotoInfo::new(index))))
                                } else {
                                    None
                                }
                            }
                        }
                    }
                    HoleSignal::Valley | HoleSignal::Nothing => None,
                }
            }
            (FrameDetector::Vision(detector), Reading::Detections(detections)) => {
                match detector.feed(&detections) {
                    VisionSignal::Finished => {
                        info!(frames = self.frames, steps = self.steps, "No more holes");
                        Some(None)
                    }
                    VisionSignal::Photo(bbox) => {
                        let info = PhotoInfo::new(self.frames).with_crop(bbox.as_crop());
                        self.frames += 1;
                        metrics::FRAMES_DETECTED
                            .with_label_values(&["vision"])
                            .inc();
                        Some(Some(FrameEvent::Photo(info)))
                    }
                    VisionSignal::Nothing => None,
                }
            }
            // Sampler and detector are built from the same strategy.
            _ => None,
        }
    }
}
