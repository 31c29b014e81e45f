// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Digital I/O traits and common types

use serde::{Deserialize, Serialize};

/// Logic level sampled from a digital input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Raw input lines read once per loop tick.
///
/// Implementations only sample; debouncing and edge handling live in
/// [`ArmDisarmController`](super::ArmDisarmController) and
/// [`MotionGate`](super::MotionGate).
pub trait InputPins: Send {
    /// Arm/disarm push button. Active-low (pull-up, pressed = `Low`).
    fn switch_level(&mut self) -> Level;

    /// PIR sensor output. Active-high.
    fn motion_level(&mut self) -> Level;
}

/// Single output lamp that is lit while a capture is being processed
pub trait Indicator: Send {
    fn set_active(&mut self, active: bool);

    fn is_active(&self) -> bool;
}
