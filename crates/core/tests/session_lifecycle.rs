//! Session lifecycle integration tests.
//!
//! These wire a full session from mocks: camera -> capture -> tagging queue ->
//! archive, with events recorded along the way.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use filmscan_core::{
    create_tagging_pipeline,
    hardware::{BoundingBox, DetectionLabel, DetectionResult},
    testing::{
        fixtures, MockCameraDevice, MockLamp, MockMotor, MockTagger, MockVisionSensor,
        RecordingEventSink, ScriptedLightSensor,
    },
    CaptureCoordinator, DetectionStrategy, FrameCounter, FsArchiveMover, ScanError, ScanRig,
    ScannerConfig, SessionDeps, SessionError, SessionManager, SessionSettings, SessionState,
};

/// Logs to the test output, filtered by `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct TestHarness {
    manager: SessionManager,
    camera: MockCameraDevice,
    tagger: MockTagger,
    events: RecordingEventSink,
    backlight: MockLamp,
    downloads: TempDir,
    archive: TempDir,
}

impl TestHarness {
    fn illuminance(cycles: usize) -> Self {
        let rig = ScanRig::new(Arc::new(MockMotor::new()))
            .with_light_sensor(Arc::new(ScriptedLightSensor::new(fixtures::film_strip(cycles))));
        Self::new(fixtures::fast_config(), rig)
    }

    fn new(config: ScannerConfig, rig: ScanRig) -> Self {
        init_tracing();
        let downloads = TempDir::new().expect("Failed to create temp dir");
        let archive = TempDir::new().expect("Failed to create temp dir");
        let camera = MockCameraDevice::new();
        let tagger = MockTagger::new();
        let events = RecordingEventSink::new();
        let backlight = MockLamp::new();

        let capture = Arc::new(CaptureCoordinator::new(
            Box::new(camera.clone()),
            downloads.path(),
            config.capture.clone(),
        ));
        let (tagging, worker) = create_tagging_pipeline(
            Arc::new(tagger.clone()),
            Arc::new(FsArchiveMover::new()),
            archive.path(),
        );
        tokio::spawn(worker.run());

        let manager = SessionManager::new(SessionDeps {
            config,
            rig: rig.with_backlight(Arc::new(backlight.clone())),
            capture,
            events: Arc::new(events.clone()),
            tagging,
        })
        .expect("valid config");

        Self {
            manager,
            camera,
            tagger,
            events,
            backlight,
            downloads,
            archive,
        }
    }

    async fn wait_for_event(&self, name: &str) -> bool {
        fixtures::wait_until(Duration::from_secs(5), || {
            self.events.session_event_names().iter().any(|n| *n == name)
        })
        .await
    }

    async fn wait_for_tagged(&self, count: usize) -> bool {
        for _ in 0..POLL_ATTEMPTS {
            if self.tagger.tagged().await.len() >= count {
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        false
    }

    async fn wait_for_archived(&self, name: &str) -> bool {
        let path = self.archive.path().join(name);
        fixtures::wait_until(Duration::from_secs(5), || path.exists()).await
    }

    async fn wait_for_no_session(&self) -> bool {
        for _ in 0..POLL_ATTEMPTS {
            if self.manager.current().await.is_none() {
                return true;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        false
    }
}

const POLL_ATTEMPTS: usize = 500;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn settings_from(frame: &str) -> SessionSettings {
    SessionSettings {
        metadata: Some(fixtures::roll_metadata()),
        initial_frame: FrameCounter::parse(frame).expect("valid frame"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_roll_is_tagged_and_archived() {
    let h = TestHarness::illuminance(17);
    let session = assert_ok!(h.manager.get_or_create(settings_from("5")).await);
    assert!(h.wait_for_event("start").await);
    assert_eq!(session.state(), SessionState::Active);

    let scan = session.start_scan();
    assert!(session.is_scanning());
    assert_eq!(assert_ok!(scan.await.unwrap()), 3);

    assert!(h.wait_for_event("scan_finished").await);
    assert_eq!(
        h.events.session_event_names(),
        vec![
            "start",
            "scan_started",
            "scanned_photo",
            "scanned_photo",
            "scanned_photo",
            "stop",
            "scan_finished"
        ]
    );
    let id = session.id();
    assert!(h.events.session_events().iter().all(|e| e.session_id() == id));

    // Frames continue from the configured start, one per photo.
    assert_eq!(session.current_frame(), FrameCounter::new(8));
    assert!(h.wait_for_tagged(3).await);
    let exposures: Vec<Option<i32>> = h
        .tagger
        .tagged()
        .await
        .iter()
        .map(|(_, metadata)| metadata.exposure_number)
        .collect();
    assert_eq!(exposures, vec![Some(5), Some(6), Some(7)]);
    for (_, metadata) in h.tagger.tagged().await {
        assert_eq!(metadata.film, "Tri-X 400");
        assert!(metadata.crop.is_none());
    }

    for name in ["IMG_0001.JPG", "IMG_0002.JPG", "IMG_0003.JPG"] {
        assert!(h.wait_for_archived(name).await);
        assert!(!h.downloads.path().join(name).exists());
    }

    // A finished session releases the camera and leaves the manager empty.
    assert!(h.wait_for_no_session().await);
    assert!(!session.is_scanning());
    assert_eq!(h.camera.exit_count().await, 1);
    assert_eq!(h.backlight.history().await, vec![true, false]);
}

#[tokio::test]
async fn test_extra_files_follow_the_photo() {
    let mut config = fixtures::fast_config();
    // Leaves the monitor time to fetch the last photo's second file.
    config.scan.lamp_settle_delay_ms = 20;
    let rig = ScanRig::new(Arc::new(MockMotor::new()))
        .with_light_sensor(Arc::new(ScriptedLightSensor::new(fixtures::film_strip(9))));
    let h = TestHarness::new(config, rig);
    h.camera.set_files_per_capture(2).await;

    let session = assert_ok!(
        h.manager
            .get_or_create(SessionSettings {
                max_files_per_photo: 2,
                delete_after_download: true,
                ..settings_from("1")
            })
            .await
    );
    assert_eq!(assert_ok!(session.start_scan().await.unwrap()), 2);

    assert!(h.wait_for_tagged(4).await);
    for name in ["IMG_0001.JPG", "IMG_0001.CR3", "IMG_0002.JPG", "IMG_0002.CR3"] {
        assert!(h.wait_for_archived(name).await);
    }

    // Both files of a photo carry the same exposure number.
    let tagged = h.tagger.tagged().await;
    for (path, metadata) in &tagged {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        let expected = if name.starts_with("IMG_0001") { 1 } else { 2 };
        assert_eq!(metadata.exposure_number, Some(expected), "{}", name);
    }
    assert_eq!(h.camera.deleted_files().await.len(), 4);
}

#[tokio::test]
async fn test_single_session_policy() {
    let h = TestHarness::illuminance(9);
    let first = assert_ok!(h.manager.get_or_create(settings_from("3")).await);
    let second = assert_ok!(h.manager.get_or_create(SessionSettings::default()).await);

    assert_eq!(first.id(), second.id());
    assert_eq!(second.current_frame(), FrameCounter::new(3));
    assert_eq!(h.manager.list_ids().await, vec![first.id()]);
    assert_eq!(h.camera.init_count().await, 1);

    let found = assert_ok!(h.manager.get(first.id()).await);
    assert_eq!(found.id(), first.id());
}

#[tokio::test]
async fn test_unknown_session() {
    let h = TestHarness::illuminance(9);
    let id = uuid::Uuid::new_v4();
    let err = assert_err!(h.manager.get(id).await);
    assert!(matches!(err, SessionError::SessionNotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_stop_releases_camera_and_allows_new_session() {
    let h = TestHarness::illuminance(9);
    let session = assert_ok!(h.manager.get_or_create(SessionSettings::default()).await);
    assert!(h.wait_for_event("start").await);

    assert_ok!(h.manager.stop(session.id()).await);
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(h.wait_for_event("stop").await);
    assert_eq!(h.camera.exit_count().await, 1);
    assert!(h.manager.list_ids().await.is_empty());

    let err = assert_err!(h.manager.stop(session.id()).await);
    assert!(matches!(err, SessionError::SessionNotFound(_)));

    let next = assert_ok!(h.manager.get_or_create(SessionSettings::default()).await);
    assert_ne!(next.id(), session.id());
    assert_eq!(h.camera.init_count().await, 2);
}

#[tokio::test]
async fn test_stop_during_scan() {
    let mut config = fixtures::fast_config();
    config.scan.lamp_settle_delay_ms = 50;
    let rig = ScanRig::new(Arc::new(MockMotor::new()))
        .with_light_sensor(Arc::new(ScriptedLightSensor::new(fixtures::film_strip(33))));
    let h = TestHarness::new(config, rig);
    let session = assert_ok!(h.manager.get_or_create(SessionSettings::default()).await);

    let scan = session.start_scan();
    assert!(h.wait_for_event("scanned_photo").await);
    assert_ok!(h.manager.stop(session.id()).await);

    // The running scan notices the stop and ends early.
    let count = assert_ok!(scan.await.unwrap());
    assert!(count < 5);
    assert!(h.wait_for_event("scan_finished").await);
    assert!(!session.is_scanning());
    assert_eq!(h.camera.exit_count().await, 1);
}

#[tokio::test]
async fn test_stopped_scan_finishing_late_leaves_next_session_connected() {
    let mut config = fixtures::fast_config();
    // Keeps the stopped scan's last lamp settle running after the next
    // session is created.
    config.scan.lamp_settle_delay_ms = 200;
    let rig = ScanRig::new(Arc::new(MockMotor::new()))
        .with_light_sensor(Arc::new(ScriptedLightSensor::new(fixtures::film_strip(33))));
    let h = TestHarness::new(config, rig);
    let first = assert_ok!(h.manager.get_or_create(SessionSettings::default()).await);

    let scan = first.start_scan();
    assert!(h.wait_for_event("scanned_photo").await);
    assert_ok!(h.manager.stop(first.id()).await);

    let next = assert_ok!(h.manager.get_or_create(SessionSettings::default()).await);
    assert_ne!(next.id(), first.id());
    assert!(next.capture().is_connected());

    assert_ok!(scan.await.unwrap());
    assert!(h.wait_for_event("scan_finished").await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The old session's end must not touch the camera the new one holds.
    assert!(next.capture().is_connected());
    assert_eq!(next.state(), SessionState::Active);
    let current = h.manager.current().await.expect("next session is registered");
    assert_eq!(current.id(), next.id());
    assert_eq!(h.camera.exit_count().await, 1);
}

#[tokio::test]
async fn test_skip_holes_then_scan() {
    let mut config = fixtures::fast_config();
    config.illuminance.capture_leading_frame = false;
    let rig = ScanRig::new(Arc::new(MockMotor::new()))
        .with_light_sensor(Arc::new(ScriptedLightSensor::new(fixtures::film_strip(17))));
    let h = TestHarness::new(config, rig);
    let session = assert_ok!(h.manager.get_or_create(settings_from("00")).await);
    assert!(session.supports_hole_skipping());

    let skipped = assert_ok!(session.skip_holes(2));
    assert_eq!(assert_ok!(skipped.await.unwrap()), 2);
    assert!(h.wait_for_event("holes_skipped").await);
    assert_eq!(session.state(), SessionState::Active);

    assert_eq!(assert_ok!(session.start_scan().await.unwrap()), 1);
    assert!(h.wait_for_tagged(1).await);
    // "00" is the frame before frame 0.
    assert_eq!(h.tagger.tagged().await[0].1.exposure_number, Some(-1));
    assert_eq!(session.current_frame(), FrameCounter::new(0));
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let h = TestHarness::illuminance(9);
    h.camera
        .set_init_error(filmscan_core::HardwareError::Camera("no camera found".into()))
        .await;

    let err = assert_err!(h.manager.get_or_create(SessionSettings::default()).await);
    assert!(matches!(err, SessionError::Capture(_)));
    assert!(h.manager.current().await.is_none());
    assert!(h.events.events().is_empty());
}

fn vision_frame(photo: bool) -> Vec<DetectionResult> {
    let mut detections: Vec<DetectionResult> = (0..6)
        .map(|i| {
            let x = i as f32 * 0.15;
            DetectionResult::new(
                DetectionLabel::Hole,
                BoundingBox::new(x, 0.0, x + 0.05, 0.05),
                0.9,
            )
        })
        .collect();
    if photo {
        detections.push(DetectionResult::new(
            DetectionLabel::Photo,
            BoundingBox::new(0.05, 0.1, 0.85, 0.9),
            0.9,
        ));
    }
    detections
}

#[tokio::test]
async fn test_vision_session_uses_camera_previews() {
    let mut config = fixtures::fast_config();
    config.scan.strategy = DetectionStrategy::Vision;
    let vision = MockVisionSensor::new(vec![
        vision_frame(false),
        vision_frame(true),
        vision_frame(false),
        vision_frame(true),
    ]);
    let rig = ScanRig::new(Arc::new(MockMotor::new())).with_vision_sensor(Arc::new(vision));
    let h = TestHarness::new(config, rig);

    let session = assert_ok!(h.manager.get_or_create(settings_from("1")).await);
    assert!(!session.supports_hole_skipping());
    assert!(matches!(
        session.skip_holes(3),
        Err(ScanError::HoleSkippingUnsupported)
    ));

    assert_eq!(assert_ok!(session.start_scan().await.unwrap()), 2);
    assert!(h.camera.preview_count().await > 0);

    assert!(h.wait_for_tagged(2).await);
    for (_, metadata) in h.tagger.tagged().await {
        assert!(metadata.crop.is_some());
    }
}
