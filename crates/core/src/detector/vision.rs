use tracing::{debug, info};

use crate::config::VisionConfig;
use crate::hardware::{BoundingBox, DetectionLabel, DetectionResult};

/// What one preview frame shows after filtering the model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionObservation {
    pub hole_count: usize,
    pub has_holes: bool,
    /// Best well-framed photo box, when it covers enough of the preview.
    pub photo: Option<BoundingBox>,
    /// Area of the best candidate, even when below the coverage threshold.
    pub coverage: f32,
    pub left_separator: bool,
}

/// Outcome of feeding one preview's detections to the [`VisionDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisionSignal {
    Nothing,
    Photo(BoundingBox),
    Finished,
}

/// Finds frames by looking at the film through the camera's live view.
#[derive(Debug, Clone)]
pub struct VisionDetector {
    config: VisionConfig,
    has_seen_holes: bool,
    countdown: u32,
    last_was_photo: bool,
    finished: bool,
}

impl VisionDetector {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            config: config.clone(),
            has_seen_holes: false,
            countdown: config.finish_countdown,
            last_was_photo: false,
            finished: false,
        }
    }

    /// Filters raw detections into an observation.
    pub fn analyze(&self, detections: &[DetectionResult]) -> VisionObservation {
        let c = &self.config;
        let mut hole_count = 0;
        let mut best: Option<(BoundingBox, f32)> = None;
        let mut left_separator = false;

        for detection in detections.iter().filter(|d| d.confidence >= c.min_confidence) {
            let bbox = detection.bbox;
            match detection.label {
                label if label.is_photo() => {
                    let framed = bbox.min_x() >= c.x_margin
                        && bbox.max_x() <= 1.0 - c.x_margin
                        && bbox.min_y() >= c.y_margin
                        && bbox.max_y() <= 1.0 - c.y_margin
                        && bbox.min_x() <= c.left_side;
                    if !framed {
                        debug!(?bbox, "Photo candidate excluded by margins");
                        continue;
                    }
                    let area = bbox.area();
                    if best.map_or(true, |(_, best_area)| area > best_area) {
                        best = Some((bbox, area));
                    }
                }
                DetectionLabel::Hole => hole_count += 1,
                DetectionLabel::Separator => {
                    if bbox.max_x() <= c.left_side
                        && bbox.min_y() <= 0.20
                        && bbox.max_y() >= 0.80
                        && bbox.min_y() >= 0.01
                        && bbox.max_y() <= 0.99
                    {
                        debug!(?bbox, "Left-side separator in view");
                        left_separator = true;
                    }
                }
                DetectionLabel::Photo | DetectionLabel::PartialPhoto => {}
            }
        }

        let coverage = best.map_or(0.0, |(_, area)| area);
        let photo = best
            .filter(|(_, area)| *area >= c.min_coverage)
            .map(|(bbox, _)| bbox);

        VisionObservation {
            hole_count,
            has_holes: hole_count >= c.min_holes,
            photo,
            coverage,
            left_separator,
        }
    }

    /// Feeds one preview's detections and advances the end-of-roll countdown.
    pub fn feed(&mut self, detections: &[DetectionResult]) -> VisionSignal {
        if self.finished {
            return VisionSignal::Finished;
        }

        let observation = self.analyze(detections);
        debug!(
            holes = observation.hole_count,
            coverage = observation.coverage,
            separator = observation.left_separator,
            "Preview analyzed"
        );

        if self.has_seen_holes && !observation.has_holes {
            self.countdown = self.countdown.saturating_sub(1);
            if self.countdown == 0 {
                info!("No more holes in view, roll finished");
                self.finished = true;
                self.last_was_photo = false;
                return VisionSignal::Finished;
            }
        } else {
            self.countdown = self.config.finish_countdown;
            self.has_seen_holes = observation.has_holes;
        }

        self.last_was_photo = observation.photo.is_some();
        match observation.photo {
            Some(bbox) => VisionSignal::Photo(bbox),
            None => VisionSignal::Nothing,
        }
    }

    /// Long stride right after a photo, short stride while searching.
    pub fn step_size(&self) -> i32 {
        if self.last_was_photo {
            self.config.large_steps
        } else {
            self.config.normal_steps
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
