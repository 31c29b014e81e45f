// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Configuration module
//!
//! `Config::default()` is the complete compiled-in configuration; a TOML file
//! is only needed to override it.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::capture::{PayloadKind, SessionTimeouts, DEFAULT_MAX_IMAGE_SIZE};
use crate::core::{Millis, SystemMode};

// Upper bound for `link.max_image_size`
const MAX_IMAGE_SIZE_LIMIT: usize = 16 * 1024 * 1024;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Use the simulated camera board and simulated inputs
    pub demo_mode: bool,

    /// Which capture path to drive
    pub backend: BackendKind,

    /// Mode at power-up
    pub initial_mode: SystemMode,

    /// Loop, debounce and display timing
    pub timing: TimingConfig,

    /// Camera link settings
    pub link: LinkConfig,

    /// Report endpoint settings
    pub server: ServerConfig,

    /// Status display settings
    pub display: DisplayConfig,

    /// Demo hardware settings
    pub simulator: SimulatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "pirsnap".to_string(),
            demo_mode: false,
            backend: BackendKind::DeviceLink,
            initial_mode: SystemMode::Armed,
            timing: TimingConfig::default(),
            link: LinkConfig::default(),
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pirsnap"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values the control loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.timing.tick_interval_ms == 0 {
            bail!("timing.tick_interval_ms must be greater than zero");
        }
        if self.link.max_image_size == 0 || self.link.max_image_size > MAX_IMAGE_SIZE_LIMIT {
            bail!(
                "link.max_image_size must be within 1..={}, got {}",
                MAX_IMAGE_SIZE_LIMIT,
                self.link.max_image_size
            );
        }
        let t = self.link.timeouts();
        if t.ack_ms == 0 || t.header_ms == 0 || t.body_ms == 0 {
            bail!("link timeouts must be greater than zero");
        }
        if let Err(e) = reqwest::Url::parse(&self.server.base_url) {
            bail!("server.base_url {:?} is not a valid URL: {}", self.server.base_url, e);
        }
        Ok(())
    }
}

/// Capture path selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Camera board on a byte link, image travels to `/upload`
    DeviceLink,
    /// Camera server takes the picture when `/capture` is posted
    RemoteTrigger,
}

/// Loop and gating timing, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep between loop ticks
    pub tick_interval_ms: Millis,

    /// Minimum spacing of accepted button flips
    pub debounce_ms: Millis,

    /// Minimum spacing of motion events
    pub pir_cooldown_ms: Millis,

    /// Periodic status render while armed
    pub monitor_interval_ms: Millis,

    /// How long transient screens stay up
    pub startup_hold_ms: Millis,
    pub mode_hold_ms: Millis,
    pub sent_hold_ms: Millis,
    pub failure_hold_ms: Millis,

    /// Extra time the indicator stays lit after a cycle
    pub indicator_hold_ms: Millis,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            debounce_ms: 200,
            pir_cooldown_ms: 5_000,
            monitor_interval_ms: 10_000,
            startup_hold_ms: 1_000,
            mode_hold_ms: 1_500,
            sent_hold_ms: 1_500,
            failure_hold_ms: 2_000,
            indicator_hold_ms: 1_000,
        }
    }
}

/// Camera link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial device, e.g. `/dev/ttyUSB0`
    pub port: Option<String>,

    pub baud_rate: u32,

    pub ack_timeout_ms: Millis,
    pub header_timeout_ms: Millis,
    pub body_timeout_ms: Millis,

    /// Sleep between reads while a session waits for data
    pub poll_interval_ms: Millis,

    /// Wait after `TEST` before reading the answer
    pub probe_wait_ms: Millis,

    /// Largest image accepted, also the receive buffer capacity
    pub max_image_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let timeouts = SessionTimeouts::default();
        Self {
            port: None,
            baud_rate: 115_200,
            ack_timeout_ms: timeouts.ack_ms,
            header_timeout_ms: timeouts.header_ms,
            body_timeout_ms: timeouts.body_ms,
            poll_interval_ms: 10,
            probe_wait_ms: 500,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

impl LinkConfig {
    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            ack_ms: self.ack_timeout_ms,
            header_ms: self.header_timeout_ms,
            body_ms: self.body_timeout_ms,
        }
    }
}

/// Report endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub upload_path: String,
    pub capture_path: String,
    pub status_path: String,

    /// `source` field of the trigger body
    pub source: String,

    pub connect_timeout_ms: Millis,
    pub response_timeout_ms: Millis,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://10.137.208.149:5000".to_string(),
            upload_path: "/upload".to_string(),
            capture_path: "/capture".to_string(),
            status_path: "/status".to_string(),
            source: "esp32".to_string(),
            connect_timeout_ms: 5_000,
            response_timeout_ms: 5_000,
        }
    }
}

impl ServerConfig {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Endpoint a payload of `kind` is posted to
    pub fn destination(&self, kind: PayloadKind) -> String {
        match kind {
            PayloadKind::Image => self.url(&self.upload_path),
            PayloadKind::Trigger => self.url(&self.capture_path),
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Attach the log-backed display
    pub enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Demo hardware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,

    /// Chance per tick that a motion episode starts
    pub motion_probability: f64,

    /// Chance per tick of a simulated button press
    pub press_probability: f64,

    pub episode_min_ms: Millis,
    pub episode_max_ms: Millis,

    pub image_min_bytes: usize,
    pub image_max_bytes: usize,

    /// Largest chunk the simulated UART hands out per read
    pub max_chunk_bytes: usize,

    /// Chance that the simulated camera answers `ERROR`
    pub camera_failure_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            motion_probability: 0.01,
            press_probability: 0.0,
            episode_min_ms: 1_500,
            episode_max_ms: 6_000,
            image_min_bytes: 2_000,
            image_max_bytes: 30_000,
            max_chunk_bytes: 256,
            camera_failure_probability: 0.05,
        }
    }
}
