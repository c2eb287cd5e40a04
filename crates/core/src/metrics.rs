//! Prometheus metrics for the scanner core.
//!
//! This module provides metrics for:
//! - Detection (holes, frames, scans)
//! - Capture (photos, downloads, failures)
//! - Post-processing (tagging, archiving)
//!
//! Nothing is registered globally; callers hand [`all_metrics`] to the
//! registry they expose.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Detection
// =============================================================================

/// Sprocket holes seen by the illuminance detector.
pub static HOLES_DETECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "filmscan_holes_detected_total",
        "Total sprocket holes detected",
    )
    .expect("valid holes metric")
});

/// Frames detected by strategy.
pub static FRAMES_DETECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmscan_frames_detected_total", "Total frames detected"),
        &["strategy"], // "illuminance", "vision"
    )
    .expect("valid frames metric")
});

/// Completed scans by result.
pub static SCANS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmscan_scans_total", "Total roll scans"),
        &["result"], // "finished", "failed"
    )
    .expect("valid scans metric")
});

// =============================================================================
// Capture
// =============================================================================

/// Shutter releases that produced a file.
pub static PHOTOS_CAPTURED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("filmscan_photos_captured_total", "Total photos captured")
        .expect("valid photos metric")
});

/// Files pulled from the camera by path.
pub static FILES_DOWNLOADED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmscan_files_downloaded_total",
            "Total files downloaded from the camera",
        ),
        &["path"], // "sync", "monitor"
    )
    .expect("valid downloads metric")
});

/// Capture failures by stage.
pub static CAPTURE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("filmscan_capture_failures_total", "Total capture failures"),
        &["stage"], // "capture", "download", "delete", "monitor"
    )
    .expect("valid capture failures metric")
});

/// Time from shutter release to first file on disk.
pub static CAPTURE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "filmscan_capture_duration_seconds",
            "Duration of capture and first download",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("valid capture duration metric")
});

// =============================================================================
// Post-processing
// =============================================================================

/// Tagging queue outcomes by result.
pub static FILES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "filmscan_files_processed_total",
            "Total files tagged and archived",
        ),
        &["result"], // "archived", "tag_failed", "move_failed"
    )
    .expect("valid processed metric")
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Detection
        Box::new(HOLES_DETECTED.clone()),
        Box::new(FRAMES_DETECTED.clone()),
        Box::new(SCANS_TOTAL.clone()),
        // Capture
        Box::new(PHOTOS_CAPTURED.clone()),
        Box::new(FILES_DOWNLOADED.clone()),
        Box::new(CAPTURE_FAILURES.clone()),
        Box::new(CAPTURE_DURATION.clone()),
        // Post-processing
        Box::new(FILES_PROCESSED.clone()),
    ]
}

/// Registers every core metric with `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_metrics() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();

        FRAMES_DETECTED.with_label_values(&["illuminance"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"filmscan_frames_detected_total".to_string()));
    }

    #[test]
    fn test_capture_duration_is_unlabelled() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();

        CAPTURE_DURATION.observe(0.3);
        let family = registry
            .gather()
            .into_iter()
            .find(|f| f.get_name() == "filmscan_capture_duration_seconds")
            .unwrap();
        let metric = &family.get_metric()[0];
        assert!(metric.get_label().is_empty());
        assert!(metric.get_histogram().get_sample_count() >= 1);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();
        assert!(register_metrics(&registry).is_err());
    }
}
