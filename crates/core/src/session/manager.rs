use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::error::SessionError;
use super::orchestrator::Session;
use super::settings::SessionSettings;
use crate::capture::CaptureCoordinator;
use crate::config::{validate_config, DetectionStrategy, ScannerConfig};
use crate::events::{BroadcastEventSink, EventSink};
use crate::hardware::{CameraDevice, PreviewSource};
use crate::pipeline::{
    create_tagging_pipeline, ArchiveMover, MetadataTagger, TaggingHandle, TaggingWorker,
};
use crate::scan::ScanRig;

/// Everything a session is built from.
#[derive(Clone)]
pub struct SessionDeps {
    pub config: ScannerConfig,
    pub rig: ScanRig,
    pub capture: Arc<CaptureCoordinator>,
    pub events: Arc<dyn EventSink>,
    pub tagging: TaggingHandle,
}

impl SessionDeps {
    /// Builds the capture coordinator, tagging queue and event sink from the
    /// `[capture]`, `[storage]` and `[events]` sections of `config`.
    ///
    /// The worker must be spawned for queued files to be tagged and archived.
    /// The returned sink is the one sessions publish to; subscribe to it for
    /// events.
    pub fn from_config(
        config: ScannerConfig,
        rig: ScanRig,
        camera: Box<dyn CameraDevice>,
        tagger: Arc<dyn MetadataTagger>,
        mover: Arc<dyn ArchiveMover>,
    ) -> (Self, TaggingWorker, Arc<BroadcastEventSink>) {
        let capture = Arc::new(CaptureCoordinator::new(
            camera,
            config.storage.download_dir.clone(),
            config.capture.clone(),
        ));
        let (tagging, worker) =
            create_tagging_pipeline(tagger, mover, config.storage.destination_dir.clone());
        let events = Arc::new(BroadcastEventSink::new(config.events.capacity));

        let deps = Self {
            config,
            rig,
            capture,
            events: events.clone(),
            tagging,
        };
        (deps, worker, events)
    }
}

/// Holds the current session, if any.
#[derive(Default)]
pub(crate) struct SessionRegistry {
    current: Mutex<Option<Arc<Session>>>,
}

impl SessionRegistry {
    /// Forgets the session if it is still the current one.
    pub(crate) async fn remove(&self, id: Uuid) -> Option<Arc<Session>> {
        let mut current = self.current.lock().await;
        if current.as_ref().map(|s| s.id()) == Some(id) {
            current.take()
        } else {
            None
        }
    }
}

/// Creates sessions and enforces that at most one exists at a time.
pub struct SessionManager {
    deps: SessionDeps,
    registry: Arc<SessionRegistry>,
}

impl SessionManager {
    /// Builds a manager after validating `deps.config`. With the vision
    /// strategy and no preview source in the rig, previews are taken from the
    /// capture coordinator.
    pub fn new(mut deps: SessionDeps) -> Result<Self, SessionError> {
        validate_config(&deps.config)?;
        if deps.config.scan.strategy == DetectionStrategy::Vision && deps.rig.preview.is_none() {
            deps.rig.preview = Some(deps.capture.clone() as Arc<dyn PreviewSource>);
        }
        Ok(Self {
            deps,
            registry: Arc::new(SessionRegistry::default()),
        })
    }

    /// Returns the current session, or creates one with `settings`.
    ///
    /// An existing session is returned unchanged; `settings` are ignored then.
    pub async fn get_or_create(
        &self,
        settings: SessionSettings,
    ) -> Result<Arc<Session>, SessionError> {
        let mut current = self.registry.current.lock().await;
        if let Some(session) = current.as_ref() {
            info!(session_id = %session.id(), "Session already exists");
            return Ok(session.clone());
        }

        let session =
            Session::create(&self.deps, settings, Arc::downgrade(&self.registry)).await?;
        info!(session_id = %session.id(), "Created session");
        *current = Some(session.clone());
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        self.registry
            .current
            .lock()
            .await
            .as_ref()
            .filter(|session| session.id() == id)
            .cloned()
            .ok_or(SessionError::SessionNotFound(id))
    }

    pub async fn current(&self) -> Option<Arc<Session>> {
        self.registry.current.lock().await.clone()
    }

    pub async fn list_ids(&self) -> Vec<Uuid> {
        self.registry
            .current
            .lock()
            .await
            .iter()
            .map(|session| session.id())
            .collect()
    }

    /// Stops the session and removes it.
    pub async fn stop(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self
            .registry
            .remove(id)
            .await
            .ok_or(SessionError::SessionNotFound(id))?;
        session.stop().await;
        info!(session_id = %id, "Session removed");
        Ok(())
    }
}
