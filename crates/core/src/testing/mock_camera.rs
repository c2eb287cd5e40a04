//! Mock camera for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::hardware::{
    CameraDevice, CameraEvent, CameraFilePath, CameraSetting, HardwareError, PreviewImage,
    SettingValue,
};

const FOLDER: &str = "/store_00020001/DCIM/100CANON";
const EXTENSIONS: [&str; 4] = ["JPG", "CR3", "XMP", "WAV"];

/// Mock implementation of the CameraDevice trait.
///
/// Each capture writes `files_per_capture` files sharing one stem: the first
/// is returned by `capture`, the others show up as `FileAdded` events.
/// Downloads write a small real file into the target directory.
///
/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Debug, Clone)]
pub struct MockCameraDevice {
    settings: Arc<RwLock<BTreeMap<CameraSetting, SettingValue>>>,
    setting_writes: Arc<RwLock<Vec<(CameraSetting, String)>>>,
    events: Arc<RwLock<VecDeque<CameraEvent>>>,
    files_per_capture: Arc<RwLock<usize>>,
    captures: Arc<RwLock<u32>>,
    downloaded: Arc<RwLock<Vec<CameraFilePath>>>,
    deleted: Arc<RwLock<Vec<CameraFilePath>>>,
    initialized: Arc<RwLock<bool>>,
    init_count: Arc<RwLock<usize>>,
    exit_count: Arc<RwLock<usize>>,
    preview_count: Arc<RwLock<usize>>,
    /// If set, the next `init` fails with this error.
    init_error: Arc<RwLock<Option<HardwareError>>>,
    /// If set, the next `capture` fails with this error.
    capture_error: Arc<RwLock<Option<HardwareError>>>,
    /// While set, every `write_setting` fails.
    write_error: Arc<RwLock<bool>>,
}

impl Default for MockCameraDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn choices(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl MockCameraDevice {
    pub fn new() -> Self {
        let settings = BTreeMap::from([
            (
                CameraSetting::Iso,
                SettingValue::new("100", choices(&["100", "200", "400", "800", "1600", "3200"])),
            ),
            (
                CameraSetting::Aperture,
                SettingValue::new("8", choices(&["4", "5.6", "8", "11", "16"])),
            ),
            (
                CameraSetting::ShutterSpeed,
                SettingValue::new("1/125", choices(&["1/30", "1/60", "1/125", "1/250"])),
            ),
            (
                CameraSetting::ExposureCompensation,
                SettingValue::new("0", choices(&["-1", "-0.5", "0", "0.5", "1"])),
            ),
        ]);

        Self {
            settings: Arc::new(RwLock::new(settings)),
            setting_writes: Arc::new(RwLock::new(Vec::new())),
            events: Arc::new(RwLock::new(VecDeque::new())),
            files_per_capture: Arc::new(RwLock::new(1)),
            captures: Arc::new(RwLock::new(0)),
            downloaded: Arc::new(RwLock::new(Vec::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
            initialized: Arc::new(RwLock::new(false)),
            init_count: Arc::new(RwLock::new(0)),
            exit_count: Arc::new(RwLock::new(0)),
            preview_count: Arc::new(RwLock::new(0)),
            init_error: Arc::new(RwLock::new(None)),
            capture_error: Arc::new(RwLock::new(None)),
            write_error: Arc::new(RwLock::new(false)),
        }
    }

    /// Number of files each capture writes (e.g. 2 for RAW + JPEG).
    pub async fn set_files_per_capture(&self, files: usize) {
        *self.files_per_capture.write().await = files.max(1);
    }

    /// Queue an event for `wait_for_event`.
    pub async fn push_event(&self, event: CameraEvent) {
        self.events.write().await.push_back(event);
    }

    pub async fn set_init_error(&self, error: HardwareError) {
        *self.init_error.write().await = Some(error);
    }

    pub async fn set_capture_error(&self, error: HardwareError) {
        *self.capture_error.write().await = Some(error);
    }

    pub async fn set_write_error(&self, fail: bool) {
        *self.write_error.write().await = fail;
    }

    /// Value the camera currently holds for `setting`.
    pub async fn current_value(&self, setting: CameraSetting) -> String {
        self.settings
            .read()
            .await
            .get(&setting)
            .map(|value| value.current.clone())
            .unwrap_or_default()
    }

    /// Every successful `write_setting`, in order.
    pub async fn setting_writes(&self) -> Vec<(CameraSetting, String)> {
        self.setting_writes.read().await.clone()
    }

    pub async fn capture_count(&self) -> u32 {
        *self.captures.read().await
    }

    pub async fn downloaded_files(&self) -> Vec<CameraFilePath> {
        self.downloaded.read().await.clone()
    }

    pub async fn deleted_files(&self) -> Vec<CameraFilePath> {
        self.deleted.read().await.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    pub async fn init_count(&self) -> usize {
        *self.init_count.read().await
    }

    pub async fn exit_count(&self) -> usize {
        *self.exit_count.read().await
    }

    pub async fn preview_count(&self) -> usize {
        *self.preview_count.read().await
    }
}

#[async_trait]
impl CameraDevice for MockCameraDevice {
    async fn init(&mut self) -> Result<(), HardwareError> {
        if let Some(error) = self.init_error.write().await.take() {
            return Err(error);
        }
        *self.init_count.write().await += 1;
        *self.initialized.write().await = true;
        Ok(())
    }

    async fn exit(&mut self) -> Result<(), HardwareError> {
        *self.exit_count.write().await += 1;
        *self.initialized.write().await = false;
        Ok(())
    }

    async fn capture(&mut self) -> Result<CameraFilePath, HardwareError> {
        if !*self.initialized.read().await {
            return Err(HardwareError::NotConnected("camera".to_string()));
        }
        if let Some(error) = self.capture_error.write().await.take() {
            return Err(error);
        }

        let number = {
            let mut captures = self.captures.write().await;
            *captures += 1;
            *captures
        };
        let files = *self.files_per_capture.read().await;
        let names: Vec<String> = (0..files)
            .map(|i| match EXTENSIONS.get(i) {
                Some(ext) => format!("IMG_{:04}.{}", number, ext),
                None => format!("IMG_{:04}.{:03}", number, i),
            })
            .collect();

        let mut events = self.events.write().await;
        for name in &names[1..] {
            events.push_back(CameraEvent::FileAdded(CameraFilePath::new(FOLDER, name)));
        }
        events.push_back(CameraEvent::CaptureComplete);
        Ok(CameraFilePath::new(FOLDER, &names[0]))
    }

    async fn capture_preview(&mut self) -> Result<PreviewImage, HardwareError> {
        *self.preview_count.write().await += 1;
        Ok(PreviewImage::new(vec![0xff, 0xd8, 0xff, 0xd9]))
    }

    async fn download(
        &mut self,
        file: &CameraFilePath,
        target_dir: &Path,
    ) -> Result<PathBuf, HardwareError> {
        let path = file.local_path(target_dir);
        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| HardwareError::Camera(e.to_string()))?;
        tokio::fs::write(&path, file.to_string())
            .await
            .map_err(|e| HardwareError::Camera(e.to_string()))?;
        self.downloaded.write().await.push(file.clone());
        Ok(path)
    }

    async fn delete(&mut self, file: &CameraFilePath) -> Result<(), HardwareError> {
        self.deleted.write().await.push(file.clone());
        Ok(())
    }

    async fn wait_for_event(&mut self, timeout: Duration) -> Result<CameraEvent, HardwareError> {
        if let Some(event) = self.events.write().await.pop_front() {
            return Ok(event);
        }
        if !timeout.is_zero() {
            tokio::time::sleep(timeout).await;
        }
        Ok(CameraEvent::Timeout)
    }

    async fn read_setting(
        &mut self,
        setting: CameraSetting,
    ) -> Result<SettingValue, HardwareError> {
        self.settings
            .read()
            .await
            .get(&setting)
            .cloned()
            .ok_or_else(|| HardwareError::UnsupportedSetting(setting.to_string()))
    }

    async fn write_setting(
        &mut self,
        setting: CameraSetting,
        value: &str,
    ) -> Result<(), HardwareError> {
        if *self.write_error.read().await {
            return Err(HardwareError::Camera(format!(
                "unable to write {}",
                setting
            )));
        }
        let mut settings = self.settings.write().await;
        let current = settings
            .get_mut(&setting)
            .ok_or_else(|| HardwareError::UnsupportedSetting(setting.to_string()))?;
        current.current = value.to_string();
        self.setting_writes
            .write()
            .await
            .push((setting, value.to_string()));
        Ok(())
    }
}
