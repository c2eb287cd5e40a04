use std::path::{Path, PathBuf};
use std::sync::{Arc, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::error::CaptureError;
use super::monitor::{download, DownloadMonitor};
use super::snapshot::SettingsSnapshot;
use crate::config::CaptureConfig;
use crate::hardware::{CameraDevice, CameraSetting, HardwareError, PreviewImage, PreviewSource};
use crate::metrics;
use crate::scan::CancelFlag;

/// Invoked with the local path of every downloaded file.
pub type FileCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

#[derive(Default)]
struct ConnectionState {
    connected: bool,
    snapshot: SettingsSnapshot,
    monitors: Vec<JoinHandle<()>>,
}

/// Serializes access to the camera and tracks its connection.
///
/// Settings found on connect are written back on [`close`](Self::close), on
/// reconnect and when a still-connected coordinator is dropped.
pub struct CaptureCoordinator {
    device: Arc<Mutex<Box<dyn CameraDevice>>>,
    state: std::sync::Mutex<ConnectionState>,
    lifecycle: Mutex<()>,
    stop_monitors: CancelFlag,
    download_dir: PathBuf,
    config: CaptureConfig,
}

impl CaptureCoordinator {
    pub fn new(
        device: Box<dyn CameraDevice>,
        download_dir: impl Into<PathBuf>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            state: std::sync::Mutex::new(ConnectionState::default()),
            lifecycle: Mutex::new(()),
            stop_monitors: CancelFlag::new(),
            download_dir: download_dir.into(),
            config,
        }
    }

    fn conn(&self) -> MutexGuard<'_, ConnectionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.conn().connected
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Opens the camera, closing any previous connection first.
    pub async fn connect(&self) -> Result<(), CaptureError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.close_connection().await;
        self.stop_monitors.reset();

        if let Err(e) = tokio::fs::create_dir_all(&self.download_dir).await {
            warn!(dir = %self.download_dir.display(), error = %e, "Unable to create download directory");
        }

        let mut device = self.device.lock().await;
        info!("Init camera");
        device.init().await.map_err(CaptureError::connect)?;

        let snapshot = match SettingsSnapshot::take(&mut **device).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Unable to read camera settings");
                if let Err(exit_err) = device.exit().await {
                    warn!(error = %exit_err, "Unable to release camera");
                }
                return Err(CaptureError::connect(e));
            }
        };
        drop(device);

        let mut conn = self.conn();
        conn.connected = true;
        conn.snapshot = snapshot;
        Ok(())
    }

    /// Stops monitoring, restores settings and releases the camera.
    ///
    /// Restoration failures are logged only. Closing a closed coordinator is a
    /// no-op.
    pub async fn close(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.close_connection().await;
    }

    async fn close_connection(&self) {
        let (monitors, snapshot) = {
            let mut conn = self.conn();
            if !conn.connected {
                return;
            }
            conn.connected = false;
            (
                std::mem::take(&mut conn.monitors),
                std::mem::take(&mut conn.snapshot),
            )
        };

        self.stop_monitors.cancel();
        let join_timeout = self.config.join_timeout();
        for handle in monitors {
            let abort = handle.abort_handle();
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Camera monitor ended abnormally"),
                Err(_) => {
                    warn!(timeout_secs = join_timeout.as_secs(), "Camera monitor did not stop, aborting");
                    abort.abort();
                }
            }
        }

        let mut device = self.device.lock().await;
        let failures = snapshot.restore(&mut **device).await;
        if failures > 0 {
            warn!(failures, "Camera settings only partially restored");
        }
        if let Err(e) = device.exit().await {
            warn!(error = %e, "Unable to release camera");
        }
        info!("Camera closed");
    }

    /// Captures one photo and downloads the first file right away.
    ///
    /// With `max_files > 1` a background monitor picks up the remaining files
    /// as the camera reports them. A failed capture is logged and reported as
    /// success with no file; only a missing connection is an error.
    pub async fn take_photo(
        &self,
        max_files: u32,
        delete_after_download: bool,
        on_file: FileCallback,
    ) -> Result<(), CaptureError> {
        if !self.is_connected() {
            return Err(CaptureError::NotConnected);
        }

        let started = Instant::now();
        let first = {
            let mut device = self.device.lock().await;
            info!("Capturing image");
            let file = match device.capture().await {
                Ok(file) => file,
                Err(e) => {
                    error!(error = %e, "Unable to capture photo");
                    metrics::CAPTURE_FAILURES
                        .with_label_values(&["capture"])
                        .inc();
                    return Ok(());
                }
            };
            match download(&mut **device, &file, &self.download_dir, delete_after_download).await {
                Ok(path) => path,
                Err(e) => {
                    error!(%file, error = %e, "Unable to download photo");
                    metrics::CAPTURE_FAILURES
                        .with_label_values(&["download"])
                        .inc();
                    return Ok(());
                }
            }
        };

        metrics::PHOTOS_CAPTURED.inc();
        metrics::FILES_DOWNLOADED.with_label_values(&["sync"]).inc();
        metrics::CAPTURE_DURATION.observe(started.elapsed().as_secs_f64());
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Photo captured"
        );
        on_file(first);

        if max_files > 1 {
            let monitor = DownloadMonitor {
                device: self.device.clone(),
                remaining: max_files - 1,
                delete_after_download,
                download_dir: self.download_dir.clone(),
                stop: self.stop_monitors.clone(),
                poll_interval: self.config.monitor_poll_interval(),
                deadline: self.config.monitor_deadline(),
                on_file,
            };
            let handle = tokio::spawn(monitor.run());
            let mut conn = self.conn();
            conn.monitors.retain(|m| !m.is_finished());
            conn.monitors.push(handle);
        }
        Ok(())
    }

    /// Number of download monitors still running.
    pub fn active_monitors(&self) -> usize {
        self.conn()
            .monitors
            .iter()
            .filter(|m| !m.is_finished())
            .count()
    }

    /// Current value of `setting`, read from the camera.
    pub async fn setting(&self, setting: CameraSetting) -> Result<String, CaptureError> {
        if !self.is_connected() {
            return Err(CaptureError::NotConnected);
        }
        let mut device = self.device.lock().await;
        device
            .read_setting(setting)
            .await
            .map(|value| value.current)
            .map_err(|e| CaptureError::setting(setting, e))
    }

    /// Values the camera reported as valid for `setting` when connecting.
    pub fn accepted_values(&self, setting: CameraSetting) -> Vec<String> {
        self.conn().snapshot.choices(setting).to_vec()
    }

    /// Applies `value` to `setting`; `None` or an empty value restores the
    /// value found on connect.
    pub async fn set_setting(
        &self,
        setting: CameraSetting,
        value: Option<&str>,
    ) -> Result<(), CaptureError> {
        let (connected, initial) = {
            let conn = self.conn();
            (conn.connected, conn.snapshot.get(setting).cloned())
        };
        if !connected {
            return Err(CaptureError::NotConnected);
        }

        let target = match value.filter(|v| !v.is_empty()) {
            Some(value) => match &initial {
                Some(initial) if initial.accepts(value) => value.to_string(),
                _ => {
                    return Err(CaptureError::InvalidSettingValue {
                        setting,
                        value: value.to_string(),
                    })
                }
            },
            None => match initial {
                Some(initial) => initial.current,
                None => {
                    return Err(CaptureError::setting(
                        setting,
                        HardwareError::UnsupportedSetting(setting.to_string()),
                    ))
                }
            },
        };

        let mut device = self.device.lock().await;
        device
            .write_setting(setting, &target)
            .await
            .map_err(|e| CaptureError::setting(setting, e))?;
        info!(%setting, value = %target, "Camera setting applied");
        Ok(())
    }
}

#[async_trait]
impl PreviewSource for CaptureCoordinator {
    async fn capture_preview(&self) -> Result<PreviewImage, HardwareError> {
        if !self.is_connected() {
            return Err(HardwareError::NotConnected("camera".to_string()));
        }
        let mut device = self.device.lock().await;
        device.capture_preview().await
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        let state = std::mem::take(
            self.state
                .get_mut()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        if !state.connected {
            return;
        }

        self.stop_monitors.cancel();
        for monitor in &state.monitors {
            monitor.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Camera dropped outside a runtime, settings not restored");
            return;
        };
        let device = self.device.clone();
        let snapshot = state.snapshot;
        runtime.spawn(async move {
            let mut device = device.lock().await;
            snapshot.restore(&mut **device).await;
            if let Err(e) = device.exit().await {
                warn!(error = %e, "Unable to release camera");
            }
        });
    }
}
