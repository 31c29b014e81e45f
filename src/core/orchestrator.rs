// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Cooperative control loop
//!
//! One task owns every component. Each tick samples the arm/disarm button
//! first and the motion line second; an accepted motion event runs the whole
//! capture, upload and display sequence before the next tick.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{Clock, Millis, SystemContext, SystemMode};
use crate::capture::{CaptureBackend, PayloadKind, ProbeStatus};
use crate::config::{Config, ServerConfig, TimingConfig};
use crate::display::{Message, Snapshot, StatusPresenter};
use crate::sensors::{
    ArmDisarmController, Indicator, InputPins, ModeChanged, MotionEvent, MotionGate,
};
use crate::upload::{Network, UploadOutcome, Uploader};

/// Operator-facing hardware
pub struct Peripherals {
    pub pins: Box<dyn InputPins>,
    pub indicator: Box<dyn Indicator>,
}

/// What happened during one motion-triggered cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub sequence: u64,
    pub started_at: Millis,
    pub duration_ms: Millis,
    pub payload: Option<PayloadKind>,
    pub image_bytes: usize,
    /// Set when no payload could be obtained
    pub capture_failure: Option<&'static str>,
    /// Set when the uploader was invoked
    pub upload: Option<UploadOutcome>,
}

impl CycleReport {
    pub fn delivered(&self) -> bool {
        self.upload.as_ref().is_some_and(UploadOutcome::is_delivered)
    }
}

/// What happened during one loop tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub mode_changed: Option<SystemMode>,
    pub cycle: Option<CycleReport>,
    pub monitored: bool,
}

pub struct Orchestrator {
    clock: Clock,
    timing: TimingConfig,
    server: ServerConfig,
    switch: ArmDisarmController,
    gate: MotionGate,
    backend: Box<dyn CaptureBackend>,
    uploader: Box<dyn Uploader>,
    network: Arc<dyn Network>,
    presenter: StatusPresenter,
    peripherals: Peripherals,
    context: SystemContext,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        clock: Clock,
        backend: Box<dyn CaptureBackend>,
        uploader: Box<dyn Uploader>,
        network: Arc<dyn Network>,
        presenter: StatusPresenter,
        peripherals: Peripherals,
    ) -> Self {
        Self {
            clock,
            timing: config.timing.clone(),
            server: config.server.clone(),
            switch: ArmDisarmController::new(config.initial_mode, config.timing.debounce_ms),
            gate: MotionGate::new(config.timing.pir_cooldown_ms),
            backend,
            uploader,
            network,
            presenter,
            peripherals,
            context: SystemContext::default(),
        }
    }

    pub fn mode(&self) -> SystemMode {
        self.switch.mode()
    }

    pub fn context(&self) -> &SystemContext {
        &self.context
    }

    /// Startup sequence: splash, camera probe, network report, steady view.
    /// Nothing here is fatal.
    pub async fn startup(&mut self) -> ProbeStatus {
        info!("Starting with {} backend", self.backend.name());
        self.peripherals.indicator.set_active(false);

        self.show(Message::Starting);
        self.clock.sleep(self.timing.startup_hold_ms).await;

        let probe = self.backend.probe().await;
        self.show(Message::Camera(probe.clone()));
        self.clock.sleep(self.timing.startup_hold_ms).await;

        self.context.network_up = self.network.is_connected();
        if self.context.network_up {
            let address = self.network.local_address();
            info!("Network connected, local address {}", address.as_deref().unwrap_or("unknown"));
            self.show(Message::NetworkUp(address));
        } else {
            warn!("Network not connected");
            self.show(Message::NetworkDown);
        }
        self.clock.sleep(self.timing.startup_hold_ms).await;

        self.context.last_monitor = self.clock.now();
        self.show_steady();
        info!("System ready, mode {}", self.mode().label());
        probe
    }

    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let level = self.peripherals.pins.switch_level();
        if let Some(change) = self.switch.poll(level, self.clock.now()) {
            report.mode_changed = Some(change.mode);
            self.on_mode_changed(change).await;
        }

        if !self.mode().is_armed() {
            return report;
        }

        let level = self.peripherals.pins.motion_level();
        if let Some(event) = self.gate.poll(level, self.clock.now()) {
            report.cycle = Some(self.handle_motion(event).await);
        }

        let now = self.clock.now();
        if now.saturating_sub(self.context.last_monitor) >= self.timing.monitor_interval_ms {
            self.context.last_monitor = now;
            self.context.network_up = self.network.is_connected();
            self.show(Message::Monitoring);
            report.monitored = true;
        }

        report
    }

    /// Ticks until `shutdown` fires. The signal is only observed between ticks.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("Control loop running every {} ms", self.timing.tick_interval_ms);

        loop {
            self.tick().await;

            tokio::select! {
                _ = self.clock.sleep(self.timing.tick_interval_ms) => {}
                _ = shutdown.recv() => {
                    info!("Control loop shutting down");
                    break;
                }
            }
        }

        self.peripherals.indicator.set_active(false);
        info!(
            "Stopped after {} delivered and {} failed cycles",
            self.context.image_count, self.context.failed_cycles
        );
    }

    async fn on_mode_changed(&mut self, change: ModeChanged) {
        info!("System {}", change.mode.label());
        if !change.mode.is_armed() {
            self.peripherals.indicator.set_active(false);
        }

        self.show(Message::ModeChanged(change.mode));
        self.clock.sleep(self.timing.mode_hold_ms).await;
        self.context.last_monitor = self.clock.now();
        self.show_steady();
    }

    async fn handle_motion(&mut self, event: MotionEvent) -> CycleReport {
        info!("Motion detected (event #{})", event.sequence);
        self.peripherals.indicator.set_active(true);
        self.show(Message::Motion);

        let mut report = CycleReport {
            sequence: event.sequence,
            started_at: event.at,
            duration_ms: 0,
            payload: None,
            image_bytes: 0,
            capture_failure: None,
            upload: None,
        };

        match self.backend.acquire().await {
            Ok(payload) => {
                report.payload = Some(payload.kind());
                report.image_bytes = payload.image_len();
                let destination = self.server.destination(payload.kind());
                report.upload = Some(self.uploader.send(&payload, &destination).await);
            }
            Err(e) => {
                error!("Capture failed: {}", e);
                report.capture_failure = Some(e.short_label());
            }
        }

        self.context.network_up = self.network.is_connected();
        match (&report.capture_failure, &report.upload) {
            (_, Some(outcome)) if outcome.is_delivered() => {
                self.context.image_count += 1;
                info!("Report delivered, {} images so far", self.context.image_count);
                self.show(Message::ImageSent);
                self.clock.sleep(self.timing.sent_hold_ms).await;
            }
            (_, Some(outcome)) => {
                warn!("Report not delivered: {}", outcome.short_label());
                self.context.failed_cycles += 1;
                self.show(Message::UploadFailed(outcome.clone()));
                self.clock.sleep(self.timing.failure_hold_ms).await;
            }
            (Some(reason), None) => {
                self.context.failed_cycles += 1;
                self.show(Message::CaptureFailed(*reason));
                self.clock.sleep(self.timing.failure_hold_ms).await;
            }
            (None, None) => {}
        }

        self.clock.sleep(self.timing.indicator_hold_ms).await;
        self.peripherals.indicator.set_active(false);
        self.show_steady();

        report.duration_ms = self.clock.now().saturating_sub(report.started_at);
        info!(
            "Cycle #{} finished in {} ms ({} image bytes, delivered: {})",
            report.sequence,
            report.duration_ms,
            report.image_bytes,
            report.delivered()
        );
        report
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::steady(self.mode(), self.context.network_up, self.context.image_count)
    }

    fn show(&mut self, message: Message) {
        debug!("Display: {:?}", message);
        let snapshot = self.snapshot().with_message(message);
        self.presenter.present(&snapshot);
    }

    fn show_steady(&mut self) {
        let snapshot = self.snapshot();
        self.presenter.present(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{DeviceLink, DeviceLinkBackend, Payload};
    use crate::display::{DisplaySink, Frame};
    use crate::sensors::Level;
    use crate::upload::{HttpUploader, StaticNetwork};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Pins(Arc<Mutex<(Level, Level)>>);

    impl Pins {
        fn set(&self, switch: Level, motion: Level) {
            *self.0.lock().unwrap() = (switch, motion);
        }
    }

    impl InputPins for Pins {
        fn switch_level(&mut self) -> Level {
            self.0.lock().unwrap().0
        }

        fn motion_level(&mut self) -> Level {
            self.0.lock().unwrap().1
        }
    }

    #[derive(Clone, Default)]
    struct Lamp(Arc<Mutex<Vec<bool>>>);

    impl Indicator for Lamp {
        fn set_active(&mut self, active: bool) {
            self.0.lock().unwrap().push(active);
        }

        fn is_active(&self) -> bool {
            self.0.lock().unwrap().last().copied().unwrap_or(false)
        }
    }

    #[derive(Clone, Default)]
    struct Screen(Arc<Mutex<Vec<Frame>>>);

    impl Screen {
        fn headlines(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|f| f.headline().to_string()).collect()
        }

        fn last(&self) -> Frame {
            self.0.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl DisplaySink for Screen {
        fn draw(&mut self, frame: &Frame) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    /// Hands out queued chunks one per read, as soon as asked
    struct QueueLink(VecDeque<Vec<u8>>);

    impl DeviceLink for QueueLink {
        fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        fn describe(&self) -> String {
            "queue".to_string()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Sent {
        bytes: Vec<u8>,
        destination: String,
    }

    struct RecordingUploader {
        sent: Arc<Mutex<Vec<Sent>>>,
        reply: UploadOutcome,
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        async fn send(&mut self, payload: &Payload<'_>, destination: &str) -> UploadOutcome {
            let bytes = match payload {
                Payload::Image(bytes) => bytes.to_vec(),
                Payload::Trigger(_) => Vec::new(),
            };
            self.sent.lock().unwrap().push(Sent {
                bytes,
                destination: destination.to_string(),
            });
            self.reply.clone()
        }
    }

    struct Rig {
        orch: Orchestrator,
        clock: Clock,
        pins: Pins,
        lamp: Lamp,
        screen: Screen,
        sent: Arc<Mutex<Vec<Sent>>>,
    }

    fn rig_with<F>(chunks: &[&[u8]], make_uploader: F) -> Rig
    where
        F: FnOnce(Arc<Mutex<Vec<Sent>>>) -> Box<dyn Uploader>,
    {
        let config = Config::default();
        let clock = Clock::start();
        let pins = Pins(Arc::new(Mutex::new((Level::High, Level::Low))));
        let lamp = Lamp::default();
        let screen = Screen::default();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let link = QueueLink(chunks.iter().map(|c| c.to_vec()).collect());
        let backend = DeviceLinkBackend::new(link, &config.link, clock);
        let uploader = make_uploader(sent.clone());

        let orch = Orchestrator::new(
            &config,
            clock,
            Box::new(backend),
            uploader,
            Arc::new(StaticNetwork { connected: true }),
            StatusPresenter::new(Some(Box::new(screen.clone()))),
            Peripherals {
                pins: Box::new(pins.clone()),
                indicator: Box::new(lamp.clone()),
            },
        );

        Rig { orch, clock, pins, lamp, screen, sent }
    }

    fn rig_replying(chunks: &[&[u8]], reply: UploadOutcome) -> Rig {
        rig_with(chunks, |sent| -> Box<dyn Uploader> {
            Box::new(RecordingUploader { sent, reply })
        })
    }

    fn rig(chunks: &[&[u8]]) -> Rig {
        rig_replying(chunks, UploadOutcome::Delivered(200))
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivered_capture_forwards_exact_bytes() {
        let mut r = rig(&[b"OK\n", b"SIZE:4\n", b"\xFF\xD8\xFF\xD9"]);
        r.pins.set(Level::High, Level::High);

        let report = r.orch.tick().await;
        let cycle = report.cycle.unwrap();
        assert!(cycle.delivered());
        assert_eq!(cycle.payload, Some(PayloadKind::Image));
        assert_eq!(cycle.image_bytes, 4);

        let sent = r.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bytes, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(sent[0].destination, "http://10.137.208.149:5000/upload");

        assert_eq!(r.orch.context().image_count, 1);
        assert_eq!(r.screen.headlines(), vec!["MOTION!", "Image Sent", "ARMED"]);
        assert_eq!(*r.lamp.0.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_capture_never_uploads() {
        let mut r = rig(&[b"ERROR\n"]);
        r.pins.set(Level::High, Level::High);

        let cycle = r.orch.tick().await.cycle.unwrap();
        assert_eq!(cycle.capture_failure, Some("Camera error"));
        assert_eq!(cycle.upload, None);
        assert!(r.sent.lock().unwrap().is_empty());
        assert_eq!(r.orch.context().image_count, 0);
        assert_eq!(r.orch.context().failed_cycles, 1);
        assert!(r.screen.headlines().contains(&"CAM ERROR".to_string()));
        assert!(!r.lamp.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_upload_shows_failure_and_loop_resumes() {
        let uploader = HttpUploader::new(
            &ServerConfig::default(),
            Arc::new(StaticNetwork { connected: false }),
        )
        .unwrap();
        let chunks: &[&[u8]] = &[b"OK\n", b"SIZE:4\n", b"\xFF\xD8\xFF\xD9"];
        let mut r = rig_with(chunks, |_| -> Box<dyn Uploader> { Box::new(uploader) });
        r.pins.set(Level::High, Level::High);

        let cycle = r.orch.tick().await.cycle.unwrap();
        assert_eq!(cycle.upload, Some(UploadOutcome::NetworkUnavailable));
        assert_eq!(r.orch.context().image_count, 0);

        let frames = r.screen.0.lock().unwrap().clone();
        let failure = frames.iter().find(|f| f.headline() == "SEND FAIL").unwrap();
        assert_eq!(failure.lines[1], "No WiFi");
        assert_eq!(r.screen.last().headline(), "ARMED");

        r.pins.set(Level::High, Level::Low);
        let next = r.orch.tick().await;
        assert_eq!(next.cycle, None);
        assert_eq!(r.orch.mode(), SystemMode::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_in_same_tick_suppresses_motion() {
        let mut r = rig(&[b"OK\n", b"SIZE:1\n", b"\x01"]);
        r.pins.set(Level::Low, Level::High);

        let report = r.orch.tick().await;
        assert_eq!(report.mode_changed, Some(SystemMode::Disarmed));
        assert_eq!(report.cycle, None);
        assert!(r.sent.lock().unwrap().is_empty());
        assert!(!r.lamp.is_active());
        assert_eq!(r.screen.headlines(), vec!["SYSTEM", "DISARMED"]);

        // Releasing the button leaves the mode alone
        r.pins.set(Level::High, Level::High);
        r.clock.sleep(10_000).await;
        let report = r.orch.tick().await;
        assert_eq!(report, TickReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_respects_cooldown_across_cycles() {
        let mut r = rig(&[b"OK\n", b"SIZE:1\n", b"\x01", b"OK\n", b"SIZE:1\n", b"\x02"]);

        r.pins.set(Level::High, Level::High);
        assert!(r.orch.tick().await.cycle.is_some());
        assert!(r.orch.tick().await.cycle.is_none());

        r.pins.set(Level::High, Level::Low);
        r.orch.tick().await;
        r.pins.set(Level::High, Level::High);
        assert!(r.orch.tick().await.cycle.is_none());

        r.clock.sleep(5_000).await;
        r.pins.set(Level::High, Level::Low);
        r.orch.tick().await;
        r.pins.set(Level::High, Level::High);
        let cycle = r.orch.tick().await.cycle.unwrap();
        assert_eq!(cycle.sequence, 2);
        assert_eq!(r.sent.lock().unwrap()[1].bytes, vec![0x02]);
        assert_eq!(r.orch.context().image_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_body_keeps_count() {
        let mut r = rig(&[b"OK\n", b"SIZE:4\n", b"\xFF\xD8"]);
        r.pins.set(Level::High, Level::High);

        let cycle = r.orch.tick().await.cycle.unwrap();
        assert_eq!(cycle.capture_failure, Some("Incomplete"));
        assert_eq!(cycle.upload, None);
        assert!(r.sent.lock().unwrap().is_empty());
        assert_eq!(r.orch.context().image_count, 0);
        assert_eq!(r.orch.context().failed_cycles, 1);

        let frames = r.screen.0.lock().unwrap().clone();
        let failure = frames.iter().find(|f| f.headline() == "CAM ERROR").unwrap();
        assert_eq!(failure.lines[1], "Capture Failed");
        assert_eq!(failure.lines[2], "Incomplete");
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_rejection_keeps_count() {
        let mut r = rig_replying(
            &[b"OK\n", b"SIZE:4\n", b"\xFF\xD8\xFF\xD9"],
            UploadOutcome::Rejected(500),
        );
        r.pins.set(Level::High, Level::High);

        let cycle = r.orch.tick().await.cycle.unwrap();
        assert_eq!(cycle.upload, Some(UploadOutcome::Rejected(500)));
        assert!(!cycle.delivered());
        assert_eq!(r.sent.lock().unwrap().len(), 1);
        assert_eq!(r.orch.context().image_count, 0);
        assert_eq!(r.orch.context().failed_cycles, 1);

        let frames = r.screen.0.lock().unwrap().clone();
        let failure = frames.iter().find(|f| f.headline() == "SEND FAIL").unwrap();
        assert_eq!(failure.lines[1], "HTTP 500");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_change_resets_monitor_after_hold() {
        let mut r = rig(&[]);
        r.clock.sleep(4_000).await;

        r.pins.set(Level::Low, Level::Low);
        let report = r.orch.tick().await;
        assert_eq!(report.mode_changed, Some(SystemMode::Disarmed));
        assert_eq!(r.orch.context().last_monitor, 5_500);
        assert_eq!(r.clock.now(), 5_500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_render_only_while_armed() {
        let mut r = rig(&[]);

        r.clock.sleep(10_000).await;
        let report = r.orch.tick().await;
        assert!(report.monitored);
        assert_eq!(r.screen.last().lines[1], "Monitoring...");
        assert!(!r.orch.tick().await.monitored);

        r.pins.set(Level::Low, Level::Low);
        r.orch.tick().await;
        r.pins.set(Level::High, Level::Low);
        r.clock.sleep(20_000).await;
        assert!(!r.orch.tick().await.monitored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_sequence() {
        let mut r = rig(&[b"READY\n"]);

        let probe = r.orch.startup().await;
        assert_eq!(probe, ProbeStatus::Ready);
        assert_eq!(r.screen.headlines(), vec!["System Starting", "CAM", "WiFi OK", "ARMED"]);
        assert!(r.orch.context().network_up);
        assert_eq!(r.orch.context().last_monitor, r.clock.now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let mut r = rig(&[]);
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        r.orch.run(rx).await;
        assert!(!r.lamp.is_active());
    }
}
