use std::sync::{Arc, RwLock};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, info, warn};

use super::cancel::CancelFlag;
use super::error::ScanError;
use super::scan_loop::ScanLoop;
use super::types::{FrameEvent, PhotoInfo, ScanMode, ScanRig, ScanSignal, SessionState};
use crate::config::{DetectionStrategy, ScannerConfig};
use crate::hardware::Lamp;
use crate::metrics;

/// Session lifecycle around the scan loop.
///
/// Scans and hole skips are serialized by a gate; each run gets a fresh
/// [`ScanLoop`]. Progress is reported as [`ScanSignal`]s on an unbounded
/// channel so the controller never blocks on its listener, except for the
/// capture handshake of [`ScanSignal::NextPhoto`].
pub struct ScanController {
    rig: ScanRig,
    config: ScannerConfig,
    state: RwLock<SessionState>,
    gate: Mutex<()>,
    cancel: CancelFlag,
    signals: mpsc::UnboundedSender<ScanSignal>,
}

impl ScanController {
    pub fn new(
        rig: ScanRig,
        config: ScannerConfig,
        signals: mpsc::UnboundedSender<ScanSignal>,
    ) -> Self {
        Self {
            rig,
            config,
            state: RwLock::new(SessionState::NotStarted),
            gate: Mutex::new(()),
            cancel: CancelFlag::new(),
            signals,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Applies `transition` under the state lock and returns its result.
    fn transition<T>(&self, transition: impl FnOnce(&mut SessionState) -> T) -> T {
        match self.state.write() {
            Ok(mut state) => transition(&mut *state),
            Err(poisoned) => transition(&mut *poisoned.into_inner()),
        }
    }

    pub fn strategy(&self) -> DetectionStrategy {
        self.config.scan.strategy
    }

    pub fn supports_hole_skipping(&self) -> bool {
        self.strategy() == DetectionStrategy::Illuminance
    }

    /// Enters the active state and turns the backlight on.
    ///
    /// Returns false when the session is already running or has been stopped.
    pub async fn start_session(&self) -> bool {
        let started = self.transition(|state| {
            if *state == SessionState::NotStarted {
                *state = SessionState::Active;
                true
            } else {
                false
            }
        });
        if !started {
            return false;
        }

        info!("Scan session started");
        switch_lamp(&self.rig.backlight, true, "backlight").await;
        self.emit(ScanSignal::SessionStarted);
        true
    }

    /// Cancels any running scan, switches everything off and stops for good.
    ///
    /// Returns false when the session was not running.
    pub async fn stop_session(&self) -> bool {
        let stopped = self.transition(|state| {
            if state.is_running() {
                *state = SessionState::Stopped;
                true
            } else {
                false
            }
        });
        if !stopped {
            return false;
        }

        self.cancel.cancel();
        switch_lamp(&self.rig.backlight, false, "backlight").await;
        switch_lamp(&self.rig.sensor_lamp, false, "sensor lamp").await;
        if let Some(motor) = &self.rig.motor {
            if let Err(e) = motor.stop().await {
                warn!(error = %e, "Failed to stop motor");
            }
        }

        info!("Scan session stopped");
        self.emit(ScanSignal::SessionStopped);
        true
    }

    /// Scans the roll to the end, requesting one capture per frame.
    ///
    /// Waits for any other scan or skip to finish first. The session is
    /// stopped afterwards whether the scan succeeded or not.
    pub async fn scan_roll(&self) -> Result<u32, ScanError> {
        let _gate = self.gate.lock().await;
        self.enter_scanning()?;
        self.cancel.reset();

        let started = Instant::now();
        info!(strategy = ?self.strategy(), "Ready to scan");

        match self.run_scan().await {
            Ok(count) => {
                self.stop_session().await;
                metrics::SCANS_TOTAL.with_label_values(&["finished"]).inc();
                info!(
                    count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Finished scanning"
                );
                self.emit(ScanSignal::ScanFinished { count });
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Scan aborted");
                metrics::SCANS_TOTAL.with_label_values(&["failed"]).inc();
                self.stop_session().await;
                Err(e)
            }
        }
    }

    async fn run_scan(&self) -> Result<u32, ScanError> {
        let mut scan = ScanLoop::new(&self.rig, &self.config, ScanMode::Frames, self.cancel.clone())?;
        switch_lamp(&self.rig.sensor_lamp, true, "sensor lamp").await;

        let mut count = 0;
        while let Some(event) = scan.next_event().await? {
            if let FrameEvent::Photo(info) = event {
                count += 1;
                self.request_capture(info).await?;
            }
        }
        Ok(count)
    }

    async fn request_capture(&self, info: PhotoInfo) -> Result<(), ScanError> {
        switch_lamp(&self.rig.sensor_lamp, false, "sensor lamp").await;
        tokio::time::sleep(self.config.scan.stabilization_delay()).await;

        let (captured, ack) = oneshot::channel();
        self.signals
            .send(ScanSignal::NextPhoto { info, captured })
            .map_err(|_| ScanError::OrchestratorGone)?;
        ack.await.map_err(|_| ScanError::OrchestratorGone)??;

        switch_lamp(&self.rig.sensor_lamp, true, "sensor lamp").await;
        tokio::time::sleep(self.config.scan.lamp_settle_delay()).await;
        Ok(())
    }

    /// Advances the film by `holes` holes without capturing anything.
    ///
    /// Non-positive counts return immediately. Only the illuminance strategy
    /// can count holes.
    pub async fn skip_holes(&self, holes: i64) -> Result<u32, ScanError> {
        if holes <= 0 {
            return Ok(0);
        }
        if !self.supports_hole_skipping() {
            return Err(ScanError::HoleSkippingUnsupported);
        }

        let _gate = self.gate.lock().await;
        self.enter_scanning()?;
        self.cancel.reset();

        let result = self.run_skip(holes).await;
        self.transition(|state| {
            if *state == SessionState::Scanning {
                *state = SessionState::Active;
            }
        });

        match result {
            Ok(skipped) => {
                info!(skipped, "Skipped holes");
                self.emit(ScanSignal::HolesSkipped { count: skipped });
                Ok(skipped)
            }
            Err(e) => {
                error!(error = %e, "Hole skipping aborted");
                Err(e)
            }
        }
    }

    async fn run_skip(&self, holes: i64) -> Result<u32, ScanError> {
        let mut scan = ScanLoop::new(&self.rig, &self.config, ScanMode::Holes, self.cancel.clone())?;
        switch_lamp(&self.rig.sensor_lamp, true, "sensor lamp").await;

        let mut skipped: u32 = 0;
        while i64::from(skipped) < holes {
            match scan.next_event().await? {
                Some(FrameEvent::Hole(_)) => {
                    skipped += 1;
                    info!(remaining = holes - i64::from(skipped), "Skipping hole");
                }
                Some(FrameEvent::Photo(_)) => {}
                None => break,
            }
        }
        Ok(skipped)
    }

    fn enter_scanning(&self) -> Result<(), ScanError> {
        self.transition(|state| {
            if *state == SessionState::Active {
                *state = SessionState::Scanning;
                Ok(())
            } else {
                Err(ScanError::SessionNotActive)
            }
        })
    }

    fn emit(&self, signal: ScanSignal) {
        if self.signals.send(signal).is_err() {
            warn!("Scan signal dropped, no listener");
        }
    }
}

async fn switch_lamp(lamp: &Option<Arc<dyn Lamp>>, on: bool, name: &str) {
    if let Some(lamp) = lamp {
        if let Err(e) = lamp.set(on).await {
            warn!(lamp = name, on, error = %e, "Failed to switch lamp");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::testing::fixtures::{fast_config, film_strip};
    use crate::testing::{MockLamp, MockMotor, ScriptedLightSensor};

    struct Harness {
        controller: Arc<ScanController>,
        signals: mpsc::UnboundedReceiver<ScanSignal>,
        motor: Arc<MockMotor>,
        backlight: Arc<MockLamp>,
        sensor_lamp: Arc<MockLamp>,
    }

    fn harness(cycles: usize) -> Harness {
        harness_with(cycles, fast_config())
    }

    fn harness_with(cycles: usize, config: ScannerConfig) -> Harness {
        let motor = Arc::new(MockMotor::new());
        let backlight = Arc::new(MockLamp::new());
        let sensor_lamp = Arc::new(MockLamp::new());
        let rig = ScanRig::new(motor.clone())
            .with_light_sensor(Arc::new(ScriptedLightSensor::new(film_strip(cycles))))
            .with_backlight(backlight.clone())
            .with_sensor_lamp(sensor_lamp.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        Harness {
            controller: Arc::new(ScanController::new(rig, config, tx)),
            signals: rx,
            motor,
            backlight,
            sensor_lamp,
        }
    }

    /// Acks every capture request and returns every signal seen.
    fn spawn_acker(
        mut rx: mpsc::UnboundedReceiver<ScanSignal>,
    ) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(signal) = rx.recv().await {
                match signal {
                    ScanSignal::SessionStarted => seen.push("started".to_string()),
                    ScanSignal::SessionStopped => seen.push("stopped".to_string()),
                    ScanSignal::NextPhoto { info, captured } => {
                        seen.push(format!("photo:{}", info.index));
                        let _ = captured.send(Ok(()));
                    }
                    ScanSignal::ScanFinished { count } => seen.push(format!("finished:{}", count)),
                    ScanSignal::HolesSkipped { count } => seen.push(format!("skipped:{}", count)),
                }
            }
            seen
        })
    }

    #[tokio::test]
    async fn test_start_session_is_idempotent() {
        let h = harness(1);
        assert!(h.controller.start_session().await);
        assert!(!h.controller.start_session().await);
        assert_eq!(h.controller.state(), SessionState::Active);
        assert_eq!(h.backlight.history().await, vec![true]);
    }

    #[tokio::test]
    async fn test_stop_session_only_when_running() {
        let h = harness(1);
        assert!(!h.controller.stop_session().await);

        h.controller.start_session().await;
        assert!(h.controller.stop_session().await);
        assert_eq!(h.controller.state(), SessionState::Stopped);
        assert!(!h.controller.stop_session().await);
        assert_eq!(h.motor.stop_count().await, 1);
        assert_eq!(h.backlight.history().await, vec![true, false]);
        assert_eq!(h.sensor_lamp.history().await, vec![false]);

        // Stopped is terminal.
        assert!(!h.controller.start_session().await);
    }

    #[tokio::test]
    async fn test_scan_roll_signals() {
        let h = harness(17);
        let acker = spawn_acker(h.signals);
        h.controller.start_session().await;

        let count = h.controller.scan_roll().await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(h.controller.state(), SessionState::Stopped);

        drop(h.controller);
        let seen = acker.await.unwrap();
        assert_eq!(
            seen,
            vec![
                "started", "photo:0", "photo:1", "photo:2", "stopped", "finished:3"
            ]
        );
    }

    #[tokio::test]
    async fn test_sensor_lamp_off_during_capture() {
        let h = harness(9);
        let acker = spawn_acker(h.signals);
        h.controller.start_session().await;
        h.controller.scan_roll().await.unwrap();
        drop(h.controller);
        acker.await.unwrap();

        // on for the scan, off/on around each of two photos, off at stop
        assert_eq!(
            h.sensor_lamp.history().await,
            vec![true, false, true, false, true, false]
        );
    }

    #[tokio::test]
    async fn test_scan_requires_active_session() {
        let h = harness(2);
        assert!(matches!(
            h.controller.scan_roll().await,
            Err(ScanError::SessionNotActive)
        ));
    }

    #[tokio::test]
    async fn test_capture_error_is_hard_stop() {
        let mut h = harness(17);
        h.controller.start_session().await;

        let controller = h.controller.clone();
        let scan = tokio::spawn(async move { controller.scan_roll().await });

        loop {
            match h.signals.recv().await.unwrap() {
                ScanSignal::NextPhoto { captured, .. } => {
                    let _ = captured.send(Err(CaptureError::NotConnected));
                    break;
                }
                _ => continue,
            }
        }

        let result = scan.await.unwrap();
        assert!(matches!(
            result,
            Err(ScanError::Capture(CaptureError::NotConnected))
        ));
        assert_eq!(h.controller.state(), SessionState::Stopped);
        assert_eq!(h.motor.stop_count().await, 1);
    }

    #[tokio::test]
    async fn test_dropped_listener_aborts_scan() {
        let h = harness(17);
        h.controller.start_session().await;
        drop(h.signals);
        assert!(matches!(
            h.controller.scan_roll().await,
            Err(ScanError::OrchestratorGone)
        ));
    }

    #[tokio::test]
    async fn test_skip_holes_noop_for_non_positive() {
        let h = harness(4);
        h.controller.start_session().await;
        assert_eq!(h.controller.skip_holes(0).await.unwrap(), 0);
        assert_eq!(h.controller.skip_holes(-1).await.unwrap(), 0);
        assert_eq!(h.motor.rotation_count().await, 0);
    }

    #[tokio::test]
    async fn test_skip_holes_consumes_exactly_n() {
        let h = harness(17);
        let acker = spawn_acker(h.signals);
        h.controller.start_session().await;

        assert_eq!(h.controller.skip_holes(3).await.unwrap(), 3);
        assert_eq!(h.controller.state(), SessionState::Active);

        drop(h.controller);
        let seen = acker.await.unwrap();
        assert_eq!(seen, vec!["started", "skipped:3"]);
    }

    #[tokio::test]
    async fn test_skip_then_scan_continues_counting() {
        let mut config = fast_config();
        config.illuminance.capture_leading_frame = false;
        let h = harness_with(17, config);
        let acker = spawn_acker(h.signals);
        h.controller.start_session().await;

        // The scan starts over with an empty window and finds 8 more holes.
        h.controller.skip_holes(2).await.unwrap();
        let count = h.controller.scan_roll().await.unwrap();
        assert_eq!(count, 1);

        drop(h.controller);
        let seen = acker.await.unwrap();
        assert_eq!(seen[1], "skipped:2");
        assert_eq!(seen[2], "photo:1");
    }

    #[tokio::test]
    async fn test_skip_holes_unsupported_for_vision() {
        let mut config = fast_config();
        config.scan.strategy = DetectionStrategy::Vision;
        let h = harness_with(1, config);
        h.controller.start_session().await;
        assert!(!h.controller.supports_hole_skipping());
        assert!(matches!(
            h.controller.skip_holes(2).await,
            Err(ScanError::HoleSkippingUnsupported)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_scans_do_not_interleave() {
        let h = harness(17);
        let acker = spawn_acker(h.signals);
        h.controller.start_session().await;

        let a = tokio::spawn({
            let c = h.controller.clone();
            async move { c.scan_roll().await }
        });
        let b = tokio::spawn({
            let c = h.controller.clone();
            async move { c.scan_roll().await }
        });
        let results = vec![a.await.unwrap(), b.await.unwrap()];

        let finished = results.iter().filter(|r| matches!(r, Ok(3))).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(ScanError::SessionNotActive)))
            .count();
        assert_eq!((finished, rejected), (1, 1));

        drop(h.controller);
        let seen = acker.await.unwrap();
        let photos: Vec<_> = seen.iter().filter(|s| s.starts_with("photo")).collect();
        assert_eq!(photos, vec!["photo:0", "photo:1", "photo:2"]);
    }

    #[tokio::test]
    async fn test_stop_cancels_running_scan() {
        let mut h = harness(17);
        h.controller.start_session().await;

        let controller = h.controller.clone();
        let scan = tokio::spawn(async move { controller.scan_roll().await });

        // Stop while the first capture is pending, then release it.
        loop {
            if let ScanSignal::NextPhoto { captured, .. } = h.signals.recv().await.unwrap() {
                assert!(h.controller.stop_session().await);
                let _ = captured.send(Ok(()));
                break;
            }
        }

        assert_eq!(scan.await.unwrap().unwrap(), 1);
        assert_eq!(h.motor.rotation_count().await, 0);
    }
}
