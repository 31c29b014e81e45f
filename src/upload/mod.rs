//! Upload module - report captures to the network endpoint

mod http;
mod network;

pub use http::{HttpUploader, ServerReply};
pub use network::{HostNetwork, Network, StaticNetwork};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::Payload;

/// Result of one delivery attempt. Produced exactly once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadOutcome {
    /// Server answered 2xx
    Delivered(u16),
    /// Server answered with any other status
    Rejected(u16),
    /// No connectivity; nothing was attempted
    NetworkUnavailable,
    /// Connect, DNS or timeout failure
    TransportFailure(String),
}

impl UploadOutcome {
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            UploadOutcome::Delivered(status)
        } else {
            UploadOutcome::Rejected(status)
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, UploadOutcome::Delivered(_))
    }

    pub fn short_label(&self) -> String {
        match self {
            UploadOutcome::Delivered(code) => format!("HTTP {}", code),
            UploadOutcome::Rejected(code) => format!("HTTP {}", code),
            UploadOutcome::NetworkUnavailable => "No WiFi".to_string(),
            UploadOutcome::TransportFailure(_) => "Server down".to_string(),
        }
    }
}

/// Delivers a payload to a destination URL. Never retries.
#[async_trait]
pub trait Uploader: Send {
    async fn send(&mut self, payload: &Payload<'_>, destination: &str) -> UploadOutcome;
}
