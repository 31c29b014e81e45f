//! Core module - clock, shared loop state and the orchestrator

mod clock;
mod orchestrator;

pub use clock::{Clock, Millis};
pub use orchestrator::{CycleReport, Orchestrator, Peripherals, TickReport};

use serde::{Deserialize, Serialize};

/// Whether motion events are acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemMode {
    Armed,
    Disarmed,
}

impl SystemMode {
    pub fn toggled(self) -> Self {
        match self {
            SystemMode::Armed => SystemMode::Disarmed,
            SystemMode::Disarmed => SystemMode::Armed,
        }
    }

    pub fn is_armed(self) -> bool {
        self == SystemMode::Armed
    }

    pub fn label(self) -> &'static str {
        match self {
            SystemMode::Armed => "ARMED",
            SystemMode::Disarmed => "DISARMED",
        }
    }
}

impl Default for SystemMode {
    fn default() -> Self {
        SystemMode::Armed
    }
}

/// Loop-lifetime counters; nothing here survives a restart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemContext {
    /// Captures that were obtained and delivered
    pub image_count: u32,
    /// Baseline for the periodic monitor render
    pub last_monitor: Millis,
    /// Connectivity as last observed
    pub network_up: bool,
    /// Attempts that ended without a delivered report
    pub failed_cycles: u32,
}
