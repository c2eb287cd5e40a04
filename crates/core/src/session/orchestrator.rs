use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::SessionError;
use super::frame_counter::FrameCounter;
use super::manager::{SessionDeps, SessionRegistry};
use super::settings::SessionSettings;
use crate::capture::{CaptureCoordinator, FileCallback};
use crate::events::{EventSink, SessionEvent};
use crate::pipeline::TaggingHandle;
use crate::scan::{PhotoInfo, ScanController, ScanError, ScanSignal, SessionState};

/// One scanning session: a connected camera, a scan controller and the
/// task that turns controller signals into captures and events.
pub struct Session {
    id: Uuid,
    settings: SessionSettings,
    controller: Arc<ScanController>,
    capture: Arc<CaptureCoordinator>,
    events: Arc<dyn EventSink>,
    current_frame: Arc<Mutex<FrameCounter>>,
    scanning: Arc<AtomicBool>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connects the camera and starts the controller.
    ///
    /// A failed camera connection is returned as is, without retrying.
    pub(crate) async fn create(
        deps: &SessionDeps,
        settings: SessionSettings,
        registry: Weak<SessionRegistry>,
    ) -> Result<Arc<Self>, SessionError> {
        settings.validate()?;

        let id = Uuid::new_v4();
        info!(session_id = %id, "Initializing camera");
        deps.capture.connect().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Arc::new(ScanController::new(
            deps.rig.clone(),
            deps.config.clone(),
            tx,
        ));
        let session = Arc::new(Self {
            id,
            current_frame: Arc::new(Mutex::new(settings.first_frame())),
            settings,
            controller: controller.clone(),
            capture: deps.capture.clone(),
            events: deps.events.clone(),
            scanning: Arc::new(AtomicBool::new(false)),
        });

        let handler = SignalHandler {
            id,
            settings: session.settings.clone(),
            controller: Arc::downgrade(&controller),
            capture: session.capture.clone(),
            events: session.events.clone(),
            tagging: deps.tagging.clone(),
            current_frame: session.current_frame.clone(),
            scanning: session.scanning.clone(),
            registry,
        };
        tokio::spawn(handler.run(rx));

        info!(session_id = %id, "Starting scanner session");
        controller.start_session().await;
        if let Some(metadata) = &session.settings.metadata {
            info!(session_id = %id, ?metadata, "Using metadata");
        }
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Frame number the next photo will be tagged with.
    pub fn current_frame(&self) -> FrameCounter {
        *lock(&self.current_frame)
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn supports_hole_skipping(&self) -> bool {
        self.controller.supports_hole_skipping()
    }

    /// The camera used by this session, for adjusting exposure settings.
    pub fn capture(&self) -> &Arc<CaptureCoordinator> {
        &self.capture
    }

    /// Starts scanning the roll in the background.
    pub fn start_scan(&self) -> JoinHandle<Result<u32, ScanError>> {
        let controller = self.controller.clone();
        let scanning = self.scanning.clone();
        scanning.store(true, Ordering::SeqCst);
        self.events
            .publish_session(&SessionEvent::ScanStarted { id: self.id });

        tokio::spawn(async move {
            let result = controller.scan_roll().await;
            if result.is_err() {
                scanning.store(false, Ordering::SeqCst);
            }
            result
        })
    }

    /// Skips `holes` holes in the background.
    pub fn skip_holes(&self, holes: i64) -> Result<JoinHandle<Result<u32, ScanError>>, ScanError> {
        if !self.supports_hole_skipping() {
            return Err(ScanError::HoleSkippingUnsupported);
        }
        let controller = self.controller.clone();
        Ok(tokio::spawn(async move { controller.skip_holes(holes).await }))
    }

    /// Stops scanning and releases the camera.
    pub async fn stop(&self) {
        info!(session_id = %self.id, "Stopping session");
        self.controller.stop_session().await;
        self.capture.close().await;
    }
}

fn lock(frame: &Mutex<FrameCounter>) -> std::sync::MutexGuard<'_, FrameCounter> {
    frame.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Consumes controller signals for one session.
///
/// Holds no strong reference to the controller, so the channel closes and
/// the task ends once the session is dropped.
struct SignalHandler {
    id: Uuid,
    settings: SessionSettings,
    controller: Weak<ScanController>,
    capture: Arc<CaptureCoordinator>,
    events: Arc<dyn EventSink>,
    tagging: TaggingHandle,
    current_frame: Arc<Mutex<FrameCounter>>,
    scanning: Arc<AtomicBool>,
    registry: Weak<SessionRegistry>,
}

impl SignalHandler {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<ScanSignal>) {
        while let Some(signal) = rx.recv().await {
            match signal {
                ScanSignal::SessionStarted => {
                    self.events.publish_session(&SessionEvent::Start { id: self.id });
                }
                ScanSignal::SessionStopped => {
                    self.scanning.store(false, Ordering::SeqCst);
                    self.events.publish_session(&SessionEvent::Stop { id: self.id });
                }
                ScanSignal::NextPhoto { info, captured } => {
                    let result = self.on_photo(info).await;
                    if captured.send(result).is_err() {
                        warn!(session_id = %self.id, "Scan went away before the capture was acknowledged");
                    }
                }
                ScanSignal::ScanFinished { count } => {
                    self.scanning.store(false, Ordering::SeqCst);
                    self.events.publish_session(&SessionEvent::ScanFinished {
                        id: self.id,
                        data: count,
                    });
                    self.finish().await;
                }
                ScanSignal::HolesSkipped { count } => {
                    self.events.publish_session(&SessionEvent::HolesSkipped {
                        id: self.id,
                        data: count,
                    });
                }
            }
        }
        debug!(session_id = %self.id, "Session signal handler finished");
    }

    async fn on_photo(&self, info: PhotoInfo) -> Result<(), crate::capture::CaptureError> {
        let frame = *lock(&self.current_frame);
        let metadata = self.settings.metadata.clone();
        let tagging = self.tagging.clone();
        let crop = info.crop;

        let on_file: FileCallback = Arc::new(move |path| {
            let file_metadata = metadata.as_ref().map(|template| {
                let tagged = template.with_frame_count(frame);
                if crop.is_some() {
                    tagged.with_crop(crop)
                } else {
                    tagged
                }
            });
            tagging.enqueue(path, file_metadata);
        });

        self.capture
            .take_photo(
                self.settings.max_files_per_photo,
                self.settings.delete_after_download,
                on_file,
            )
            .await?;

        {
            let mut current = lock(&self.current_frame);
            *current = current.next();
        }
        info!(session_id = %self.id, photo = info.index, %frame, "Scanned photo");
        self.events.publish_session(&SessionEvent::ScannedPhoto {
            id: self.id,
            data: info.index,
        });
        Ok(())
    }

    /// Ends the session after its roll finished.
    ///
    /// The camera is shared with whatever session is created next, so it is
    /// only closed while this session is still the registered one. A session
    /// already stopped through the manager has released it.
    async fn finish(&self) {
        let still_current = match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id).await.is_some(),
            None => true,
        };
        if !still_current {
            debug!(session_id = %self.id, "Session already stopped, leaving camera alone");
            return;
        }
        if let Some(controller) = self.controller.upgrade() {
            controller.stop_session().await;
        }
        self.capture.close().await;
    }
}
