use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::hardware::{CameraDevice, CameraSetting, HardwareError, SettingValue};

/// Exposure settings as found when the camera was connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSnapshot {
    values: BTreeMap<CameraSetting, SettingValue>,
}

impl SettingsSnapshot {
    /// Reads every tracked setting with its accepted values.
    pub async fn take(device: &mut dyn CameraDevice) -> Result<Self, HardwareError> {
        let mut values = BTreeMap::new();
        for setting in CameraSetting::ALL {
            let value = device.read_setting(setting).await?;
            values.insert(setting, value);
        }

        let snapshot = Self { values };
        info!(
            iso = snapshot.current(CameraSetting::Iso).unwrap_or_default(),
            aperture = snapshot.current(CameraSetting::Aperture).unwrap_or_default(),
            shutter_speed = snapshot.current(CameraSetting::ShutterSpeed).unwrap_or_default(),
            exposure_compensation = snapshot
                .current(CameraSetting::ExposureCompensation)
                .unwrap_or_default(),
            "Initial camera settings"
        );
        Ok(snapshot)
    }

    pub fn get(&self, setting: CameraSetting) -> Option<&SettingValue> {
        self.values.get(&setting)
    }

    pub fn current(&self, setting: CameraSetting) -> Option<&str> {
        self.get(setting).map(|v| v.current.as_str())
    }

    pub fn choices(&self, setting: CameraSetting) -> &[String] {
        self.get(setting).map(|v| v.choices.as_slice()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes every snapshotted value back. Failures are logged and counted.
    pub async fn restore(&self, device: &mut dyn CameraDevice) -> usize {
        let mut failures = 0;
        for (setting, value) in &self.values {
            if let Err(e) = device.write_setting(*setting, &value.current).await {
                warn!(%setting, value = %value.current, error = %e, "Unable to restore camera setting");
                failures += 1;
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCameraDevice;

    #[tokio::test]
    async fn test_take_reads_all_settings() {
        let mut camera = MockCameraDevice::new();
        let snapshot = SettingsSnapshot::take(&mut camera).await.unwrap();
        assert_eq!(snapshot.current(CameraSetting::Iso), Some("100"));
        assert!(snapshot.choices(CameraSetting::Aperture).contains(&"8".to_string()));
        assert!(!snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_restore_writes_back_and_counts_failures() {
        let mut camera = MockCameraDevice::new();
        let snapshot = SettingsSnapshot::take(&mut camera).await.unwrap();

        assert_eq!(snapshot.restore(&mut camera).await, 0);
        assert_eq!(camera.setting_writes().await.len(), 4);

        camera.set_write_error(true).await;
        assert_eq!(snapshot.restore(&mut camera).await, 4);
    }
}
