use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::coordinator::FileCallback;
use crate::hardware::{CameraDevice, CameraEvent, CameraFilePath, HardwareError};
use crate::metrics;
use crate::scan::CancelFlag;

/// Outcome of one zero-timeout poll.
enum Poll {
    Downloaded(PathBuf),
    /// Something else changed on the card; poll again right away.
    Again,
    Idle,
}

/// Background task collecting the files a capture writes after the first one.
pub(crate) struct DownloadMonitor {
    pub device: Arc<Mutex<Box<dyn CameraDevice>>>,
    pub remaining: u32,
    pub delete_after_download: bool,
    pub download_dir: PathBuf,
    pub stop: CancelFlag,
    pub poll_interval: Duration,
    pub deadline: Duration,
    pub on_file: FileCallback,
}

impl DownloadMonitor {
    pub async fn run(mut self) {
        info!(remaining = self.remaining, "Starting camera monitoring");
        let deadline = Instant::now() + self.deadline;

        while self.remaining > 0 {
            if self.stop.is_cancelled() {
                debug!(remaining = self.remaining, "Camera monitoring stopped");
                return;
            }
            if Instant::now() >= deadline {
                warn!(remaining = self.remaining, "Gave up waiting for camera files");
                return;
            }

            // The lock is released before the callback runs.
            let polled = {
                let mut device = self.device.lock().await;
                self.poll(&mut **device).await
            };

            match polled {
                Ok(Poll::Downloaded(path)) => {
                    self.remaining -= 1;
                    (self.on_file)(path);
                }
                Ok(Poll::Again) => {}
                Ok(Poll::Idle) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    warn!(error = %e, "Camera monitoring failed");
                    metrics::CAPTURE_FAILURES
                        .with_label_values(&["monitor"])
                        .inc();
                    return;
                }
            }
        }
        info!("All camera files downloaded");
    }

    async fn poll(&self, device: &mut dyn CameraDevice) -> Result<Poll, HardwareError> {
        match device.wait_for_event(Duration::ZERO).await? {
            CameraEvent::FileAdded(file) => {
                let path =
                    download(device, &file, &self.download_dir, self.delete_after_download)
                        .await?;
                metrics::FILES_DOWNLOADED
                    .with_label_values(&["monitor"])
                    .inc();
                Ok(Poll::Downloaded(path))
            }
            CameraEvent::FolderAdded(_) | CameraEvent::CaptureComplete => Ok(Poll::Again),
            CameraEvent::Timeout | CameraEvent::Unknown => Ok(Poll::Idle),
        }
    }
}

/// Copies `file` into `dir`, optionally removing it from the card.
///
/// A failed delete leaves the download in place and is only logged.
pub(crate) async fn download(
    device: &mut dyn CameraDevice,
    file: &CameraFilePath,
    dir: &std::path::Path,
    delete_after_download: bool,
) -> Result<PathBuf, HardwareError> {
    info!(%file, target = %dir.display(), "Copying image");
    let path = device.download(file, dir).await?;

    if delete_after_download {
        debug!(%file, "Deleting file on camera");
        if let Err(e) = device.delete(file).await {
            warn!(%file, error = %e, "Unable to delete file on camera");
            metrics::CAPTURE_FAILURES
                .with_label_values(&["delete"])
                .inc();
        }
    }
    Ok(path)
}
