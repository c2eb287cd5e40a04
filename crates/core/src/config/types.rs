use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::hardware::LuxChannel;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub illuminance: IlluminanceConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// How frame boundaries are found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Count sprocket holes from the light sensor waveform.
    #[default]
    Illuminance,
    /// Run object detection over camera previews.
    Vision,
}

/// Scan loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub strategy: DetectionStrategy,
    /// Motor direction multiplier, +1 or -1 depending on how the strip is loaded.
    #[serde(default = "default_direction")]
    pub direction: i32,
    /// Wait before signalling a capture, lets the strip stop vibrating (milliseconds).
    #[serde(default = "default_stabilization_delay")]
    pub stabilization_delay_ms: u64,
    /// Wait after the sensor lamp comes back on (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub lamp_settle_delay_ms: u64,
}

impl ScanConfig {
    pub fn stabilization_delay(&self) -> Duration {
        Duration::from_millis(self.stabilization_delay_ms)
    }

    pub fn lamp_settle_delay(&self) -> Duration {
        Duration::from_millis(self.lamp_settle_delay_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::default(),
            direction: default_direction(),
            stabilization_delay_ms: default_stabilization_delay(),
            lamp_settle_delay_ms: default_settle_delay(),
        }
    }
}

fn default_direction() -> i32 {
    -1
}

fn default_stabilization_delay() -> u64 {
    500
}

fn default_settle_delay() -> u64 {
    250
}

/// Light sensor hole counting
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IlluminanceConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Minimum swing between hole and film for an edge to count.
    #[serde(default = "default_min_amplitude")]
    pub min_amplitude: i64,
    #[serde(default = "default_holes_per_frame")]
    pub holes_per_frame: u32,
    #[serde(default)]
    pub channel: LuxChannel,
    /// Delay between motor steps (milliseconds).
    #[serde(default = "default_illuminance_step_delay")]
    pub step_delay_ms: u64,
    /// Capture the frame already in the gate before moving.
    #[serde(default = "default_true")]
    pub capture_leading_frame: bool,
}

impl IlluminanceConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for IlluminanceConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_amplitude: default_min_amplitude(),
            holes_per_frame: default_holes_per_frame(),
            channel: LuxChannel::default(),
            step_delay_ms: default_illuminance_step_delay(),
            capture_leading_frame: true,
        }
    }
}

fn default_window_size() -> usize {
    100
}

fn default_min_amplitude() -> i64 {
    20
}

fn default_holes_per_frame() -> u32 {
    8
}

fn default_illuminance_step_delay() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Vision frame detection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_min_holes")]
    pub min_holes: usize,
    /// Minimum fraction of the preview a photo box must cover.
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f32,
    #[serde(default = "default_x_margin")]
    pub x_margin: f32,
    #[serde(default = "default_y_margin")]
    pub y_margin: f32,
    /// Photo boxes must start left of this x coordinate.
    #[serde(default = "default_left_side")]
    pub left_side: f32,
    /// Consecutive observations without holes before the roll counts as finished.
    #[serde(default = "default_countdown")]
    pub finish_countdown: u32,
    #[serde(default = "default_normal_steps")]
    pub normal_steps: i32,
    /// Steps taken right after a photo, to clear the current frame quickly.
    #[serde(default = "default_large_steps")]
    pub large_steps: i32,
    #[serde(default = "default_vision_step_delay")]
    pub step_delay_ms: u64,
}

impl VisionConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_holes: default_min_holes(),
            min_coverage: default_min_coverage(),
            x_margin: default_x_margin(),
            y_margin: default_y_margin(),
            left_side: default_left_side(),
            finish_countdown: default_countdown(),
            normal_steps: default_normal_steps(),
            large_steps: default_large_steps(),
            step_delay_ms: default_vision_step_delay(),
        }
    }
}

fn default_min_confidence() -> f32 {
    0.25
}

fn default_min_holes() -> usize {
    4
}

fn default_min_coverage() -> f32 {
    0.4
}

fn default_x_margin() -> f32 {
    0.005
}

fn default_y_margin() -> f32 {
    0.02
}

fn default_left_side() -> f32 {
    0.10
}

fn default_countdown() -> u32 {
    3
}

fn default_normal_steps() -> i32 {
    3
}

fn default_large_steps() -> i32 {
    90
}

fn default_vision_step_delay() -> u64 {
    1
}

/// Camera capture and download monitor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Bound on joining the download monitor when closing (seconds).
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u64,
    /// Pause between empty event polls (milliseconds).
    #[serde(default = "default_monitor_poll")]
    pub monitor_poll_interval_ms: u64,
    /// The monitor gives up on missing files after this long (seconds).
    #[serde(default = "default_monitor_deadline")]
    pub monitor_deadline_secs: u64,
}

impl CaptureConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }

    pub fn monitor_poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_poll_interval_ms)
    }

    pub fn monitor_deadline(&self) -> Duration {
        Duration::from_secs(self.monitor_deadline_secs)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: default_join_timeout(),
            monitor_poll_interval_ms: default_monitor_poll(),
            monitor_deadline_secs: default_monitor_deadline(),
        }
    }
}

fn default_join_timeout() -> u64 {
    10
}

fn default_monitor_poll() -> u64 {
    10
}

fn default_monitor_deadline() -> u64 {
    60
}

/// Where files go
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Files are downloaded from the camera here first.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Tagged files are moved here.
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            destination_dir: default_destination_dir(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from("scans")
}

/// Event fan-out
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    256
}
