//! Capture module - camera link protocol and capture backends

mod protocol;
mod link;
mod device;
mod remote;
mod simulator;

pub use protocol::{
    CaptureSession, ImageBuffer, Input, LinkFailure, SessionState, SessionTimeouts,
    CAPTURE_COMMAND, DEFAULT_MAX_IMAGE_SIZE, PROBE_COMMAND,
};
pub use link::DeviceLink;
#[cfg(feature = "serial")]
pub use link::SerialLink;
pub use device::DeviceLinkBackend;
pub use remote::RemoteTriggerBackend;
pub use simulator::SimulatedCamera;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of the remote capture trigger, `{"source":"esp32","motion":true}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub source: String,
    pub motion: bool,
}

/// What a backend hands to the uploader after a motion event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// JPEG bytes borrowed from the backend's image buffer
    Image(&'a [u8]),
    /// Ask a remote camera server to take the picture itself
    Trigger(TriggerRequest),
}

/// Payload discriminant, used to pick the destination endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Image,
    Trigger,
}

impl Payload<'_> {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Image(_) => PayloadKind::Image,
            Payload::Trigger(_) => PayloadKind::Trigger,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Payload::Image(_) => "image/jpeg",
            Payload::Trigger(_) => "application/json",
        }
    }

    /// Byte length of the image, zero for triggers
    pub fn image_len(&self) -> usize {
        match self {
            Payload::Image(bytes) => bytes.len(),
            Payload::Trigger(_) => 0,
        }
    }
}

/// Result of the startup handshake with the capture path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    /// The peer answered, but not with the expected token
    Unexpected(String),
    /// Nothing came back
    Silent,
}

/// Capture attempt failure
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Protocol(#[from] LinkFailure),

    #[error("camera link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    pub fn short_label(&self) -> &'static str {
        match self {
            CaptureError::Protocol(failure) => failure.short_label(),
            CaptureError::Io(_) => "Link error",
        }
    }
}

/// A way of obtaining a picture once motion has been accepted.
///
/// The orchestrator does not know which backend it drives; it only forwards
/// the returned [`Payload`] to the uploader.
#[async_trait]
pub trait CaptureBackend: Send {
    fn name(&self) -> &str;

    /// One-shot startup check. Never fatal.
    async fn probe(&mut self) -> ProbeStatus;

    /// Runs one capture attempt to completion or failure.
    async fn acquire<'a>(&'a mut self) -> Result<Payload<'a>, CaptureError>;
}
