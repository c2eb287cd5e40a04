use super::{types::ScannerConfig, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Detector window holds the four readings an edge is judged on
/// - Hole grouping is non-zero
/// - Vision thresholds are fractions
/// - Capture join timeout is positive
/// - Download and destination directories differ
pub fn validate_config(config: &ScannerConfig) -> Result<(), ConfigError> {
    if config.scan.direction == 0 {
        return Err(ConfigError::ValidationError(
            "scan.direction cannot be 0".to_string(),
        ));
    }

    if config.illuminance.window_size < 4 {
        return Err(ConfigError::ValidationError(
            "illuminance.window_size must be at least 4".to_string(),
        ));
    }

    if config.illuminance.holes_per_frame == 0 {
        return Err(ConfigError::ValidationError(
            "illuminance.holes_per_frame must be at least 1".to_string(),
        ));
    }

    for (name, value) in [
        ("vision.min_confidence", config.vision.min_confidence),
        ("vision.min_coverage", config.vision.min_coverage),
        ("vision.x_margin", config.vision.x_margin),
        ("vision.y_margin", config.vision.y_margin),
        ("vision.left_side", config.vision.left_side),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 0 and 1, got {}",
                name, value
            )));
        }
    }

    if config.vision.normal_steps <= 0 || config.vision.large_steps <= 0 {
        return Err(ConfigError::ValidationError(
            "vision step sizes must be positive".to_string(),
        ));
    }

    if config.capture.join_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "capture.join_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.storage.download_dir == config.storage.destination_dir {
        return Err(ConfigError::ValidationError(
            "storage.download_dir and storage.destination_dir must differ".to_string(),
        ));
    }

    Ok(())
}
