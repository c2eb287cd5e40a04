//! Testing utilities and mock hardware.
//!
//! Mocks share their state between clones, so a test can hand one to the
//! scanner and keep another to configure it and inspect what happened.
//!
//! # Example
//!
//! ```rust,ignore
//! use filmscan_core::testing::{fixtures, MockMotor, ScriptedLightSensor};
//!
//! let motor = Arc::new(MockMotor::new());
//! let sensor = Arc::new(ScriptedLightSensor::new(fixtures::film_strip(17)));
//! let rig = ScanRig::new(motor.clone()).with_light_sensor(sensor);
//!
//! // ... scan ...
//! assert!(motor.rotation_count().await > 0);
//! ```

mod mock_camera;
mod mock_lamp;
mod mock_motor;
mod mock_sensors;
mod mock_tagger;
mod recording_sink;

pub use mock_camera::MockCameraDevice;
pub use mock_lamp::MockLamp;
pub use mock_motor::MockMotor;
pub use mock_sensors::{MockPreviewSource, MockVisionSensor, ScriptedLightSensor};
pub use mock_tagger::MockTagger;
pub use recording_sink::RecordingEventSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::time::Duration;

    use crate::config::ScannerConfig;
    use crate::hardware::Sample;
    use crate::pipeline::MetaData;

    /// One hole passing under the sensor: bright through the hole, dark on film.
    pub const HOLE_CYCLE: [i64; 9] = [10, 10, 40, 70, 100, 100, 90, 60, 30];

    /// Illuminance trace of a strip with `cycles` holes.
    ///
    /// A flat lead-in fills the detection window, then one [`HOLE_CYCLE`] per
    /// hole, then a dark tail. Both channels carry the same value.
    pub fn film_strip(cycles: usize) -> Vec<Sample> {
        std::iter::repeat(50)
            .take(60)
            .chain(HOLE_CYCLE.iter().copied().cycle().take(HOLE_CYCLE.len() * cycles))
            .chain(std::iter::repeat(10).take(10))
            .map(|v| Sample::new(v, v))
            .collect()
    }

    /// Default configuration with every delay removed.
    pub fn fast_config() -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.scan.stabilization_delay_ms = 0;
        config.scan.lamp_settle_delay_ms = 0;
        config.illuminance.step_delay_ms = 0;
        config.vision.step_delay_ms = 0;
        config.capture.join_timeout_secs = 1;
        config.capture.monitor_poll_interval_ms = 1;
        config.capture.monitor_deadline_secs = 5;
        config
    }

    /// Metadata template for a roll of black and white film.
    pub fn roll_metadata() -> MetaData {
        MetaData {
            roll_id: "R-042".to_string(),
            film_maker: "Kodak".to_string(),
            film: "Tri-X 400".to_string(),
            film_grain: Some(3),
            film_type: "BW".to_string(),
            developer: "HC-110".to_string(),
            developer_dilution: "B".to_string(),
            ..Default::default()
        }
    }

    /// Polls `condition` every few milliseconds until it holds or `timeout`
    /// passes. Returns whether it held.
    pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
