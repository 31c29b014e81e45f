// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Arm/disarm push button - debounced toggle over an active-low input

use tracing::debug;

use super::Level;
use crate::core::{Millis, SystemMode};

/// Emitted when a button press is accepted and the mode flips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChanged {
    pub mode: SystemMode,
    pub at: Millis,
}

/// Owns the armed/disarmed mode.
///
/// The input is level-triggered: holding the button down keeps producing
/// flips, but never two within `debounce_ms` of each other.
#[derive(Debug, Clone)]
pub struct ArmDisarmController {
    mode: SystemMode,
    debounce_ms: Millis,
    last_flip: Option<Millis>,
}

impl ArmDisarmController {
    pub fn new(initial: SystemMode, debounce_ms: Millis) -> Self {
        Self {
            mode: initial,
            debounce_ms,
            last_flip: None,
        }
    }

    pub fn mode(&self) -> SystemMode {
        self.mode
    }

    pub fn last_flip(&self) -> Option<Millis> {
        self.last_flip
    }

    pub fn poll(&mut self, level: Level, now: Millis) -> Option<ModeChanged> {
        if level.is_high() {
            return None;
        }

        if let Some(last) = self.last_flip {
            if now.saturating_sub(last) < self.debounce_ms {
                return None;
            }
        }

        self.mode = self.mode.toggled();
        self.last_flip = Some(now);
        debug!("Switch accepted at {} ms -> {:?}", now, self.mode);

        Some(ModeChanged { mode: self.mode, at: now })
    }
}
