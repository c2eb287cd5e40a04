use serde::{Deserialize, Serialize};

use super::error::SessionError;
use super::frame_counter::FrameCounter;
use crate::pipeline::MetaData;

/// Per-session options, fixed once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Template tagged into every file. `None` archives files untagged.
    #[serde(default)]
    pub metadata: Option<MetaData>,
    /// Frame number of the first photo; zero when absent.
    #[serde(default)]
    pub initial_frame: Option<FrameCounter>,
    /// Files the camera writes per shot (e.g. 2 for RAW + JPEG).
    #[serde(default = "default_max_files")]
    pub max_files_per_photo: u32,
    #[serde(default)]
    pub delete_after_download: bool,
}

fn default_max_files() -> u32 {
    1
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            metadata: None,
            initial_frame: None,
            max_files_per_photo: default_max_files(),
            delete_after_download: false,
        }
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.max_files_per_photo < 1 {
            return Err(SessionError::InvalidSettings(
                "max_files_per_photo must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn first_frame(&self) -> FrameCounter {
        self.initial_frame.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: SessionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, SessionSettings::default());
        assert_eq!(settings.max_files_per_photo, 1);
        assert_eq!(settings.first_frame(), FrameCounter::new(0));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_files_rejected() {
        let settings = SessionSettings {
            max_files_per_photo: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SessionError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_deserialize_full() {
        let json = r#"{
            "metadata": {"film": "Ektar 100"},
            "initial_frame": -1,
            "max_files_per_photo": 2,
            "delete_after_download": true
        }"#;
        let settings: SessionSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.first_frame().to_string(), "00");
        assert_eq!(settings.max_files_per_photo, 2);
        assert!(settings.delete_after_download);
        assert_eq!(settings.metadata.unwrap().film, "Ektar 100");
    }
}
