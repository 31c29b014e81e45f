// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! pirsnap - motion-triggered capture orchestrator
//!
//! A PIR sensor, an arm/disarm button, a camera board and a report endpoint,
//! driven by one cooperative loop:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Orchestrator                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌────────────┐                       │
//! │  │ ArmDisarm    │ → │ MotionGate │                       │
//! │  │ Controller   │   │            │                       │
//! │  └──────────────┘   └────────────┘                       │
//! │                          ↓                               │
//! │  ┌──────────────────┐   ┌──────────────┐   ┌──────────┐  │
//! │  │ CaptureBackend   │ → │ Uploader     │ → │ Status   │  │
//! │  │ device / remote  │   │ HTTP POST    │   │ Presenter│  │
//! │  └──────────────────┘   └──────────────┘   └──────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod core;
pub mod sensors;
pub mod capture;
pub mod upload;
pub mod display;
pub mod config;

// Re-exports for convenience
pub use config::{BackendKind, Config};
pub use crate::core::{Clock, Orchestrator, Peripherals, SystemMode};
pub use capture::{CaptureBackend, DeviceLinkBackend, RemoteTriggerBackend};
pub use upload::{HttpUploader, UploadOutcome};
pub use display::StatusPresenter;

/// pirsnap version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// pirsnap name
pub const NAME: &str = "pirsnap";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    #[allow(unused_mut)]
    let mut features = vec![];

    #[cfg(feature = "serial")]
    features.push("serial".to_string());

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_lists_enabled_features() {
        let info = build_info();
        assert_eq!(info.version, VERSION);
        assert_eq!(info.features.contains(&"serial".to_string()), cfg!(feature = "serial"));
    }
}
