// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Status display - four-line snapshot of the system state
//!
//! Rendering is a pure projection of a [`Snapshot`]; the presenter only
//! forwards the resulting [`Frame`] to whatever sink is attached.

mod sinks;

pub use sinks::LogDisplay;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::ProbeStatus;
use crate::core::SystemMode;
use crate::upload::UploadOutcome;

/// Number of text lines on the panel
pub const LINES: usize = 4;

/// Transient message that overrides the steady view for one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Starting,
    Camera(ProbeStatus),
    NetworkUp(Option<String>),
    NetworkDown,
    ModeChanged(SystemMode),
    Monitoring,
    Motion,
    ImageSent,
    CaptureFailed(&'static str),
    UploadFailed(UploadOutcome),
}

/// Everything the display needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: SystemMode,
    pub network_up: bool,
    pub image_count: u32,
    pub message: Option<Message>,
}

impl Snapshot {
    pub fn steady(mode: SystemMode, network_up: bool, image_count: u32) -> Self {
        Self {
            mode,
            network_up,
            image_count,
            message: None,
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// Rendered panel content. Line 0 is drawn large.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub lines: [String; LINES],
}

impl Frame {
    fn new(
        l1: impl Into<String>,
        l2: impl Into<String>,
        l3: impl Into<String>,
        l4: impl Into<String>,
    ) -> Self {
        Self {
            lines: [l1.into(), l2.into(), l3.into(), l4.into()],
        }
    }

    pub fn headline(&self) -> &str {
        &self.lines[0]
    }
}

/// Something that can show a frame
pub trait DisplaySink: Send {
    fn draw(&mut self, frame: &Frame) -> Result<()>;
}

/// Projects a snapshot onto the panel
pub fn render(snapshot: &Snapshot) -> Frame {
    let images = format!("Images: {}", snapshot.image_count);

    match &snapshot.message {
        None => Frame::new(
            snapshot.mode.label(),
            if snapshot.network_up { "WiFi: OK" } else { "WiFi: FAIL" },
            images,
            "",
        ),
        Some(Message::Starting) => Frame::new("System Starting", "Please wait...", "", ""),
        Some(Message::Camera(ProbeStatus::Ready)) => Frame::new("CAM", "Connected!", "", ""),
        Some(Message::Camera(ProbeStatus::Unexpected(_))) => {
            Frame::new("CAM", "Unknown status", "", "")
        }
        Some(Message::Camera(ProbeStatus::Silent)) => {
            Frame::new("CAM ERROR", "Not responding", "Check wiring", "")
        }
        Some(Message::NetworkUp(addr)) => {
            Frame::new("WiFi OK", addr.clone().unwrap_or_default(), "", "")
        }
        Some(Message::NetworkDown) => Frame::new("WiFi ERROR", "Check network", "", ""),
        Some(Message::ModeChanged(SystemMode::Armed)) => {
            Frame::new("SYSTEM", "ARMED", "Ready to Detect", "")
        }
        Some(Message::ModeChanged(SystemMode::Disarmed)) => {
            Frame::new("SYSTEM", "DISARMED", "Standby Mode", "")
        }
        Some(Message::Monitoring) => Frame::new(
            "Status:",
            "Monitoring...",
            if snapshot.network_up { "WiFi: OK" } else { "WiFi: NO" },
            images,
        ),
        Some(Message::Motion) => Frame::new("MOTION!", "Detected", "Capturing...", ""),
        Some(Message::ImageSent) => {
            Frame::new("Image Sent", format!("Count: {}", snapshot.image_count), "", "")
        }
        Some(Message::CaptureFailed(reason)) => {
            Frame::new("CAM ERROR", "Capture Failed", *reason, "")
        }
        Some(Message::UploadFailed(outcome)) => {
            Frame::new("SEND FAIL", outcome.short_label(), images, "")
        }
    }
}

/// Draws snapshots on an optional sink. A missing or failing sink is
/// tolerated silently.
pub struct StatusPresenter {
    sink: Option<Box<dyn DisplaySink>>,
}

impl StatusPresenter {
    pub fn new(sink: Option<Box<dyn DisplaySink>>) -> Self {
        Self { sink }
    }

    pub fn headless() -> Self {
        Self { sink: None }
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn present(&mut self, snapshot: &Snapshot) -> Frame {
        let frame = render(snapshot);
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.draw(&frame) {
                debug!("Display draw failed: {}", e);
            }
        }
        frame
    }
}
