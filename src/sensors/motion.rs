// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! PIR motion gate - latch plus cooldown over the raw sensor output

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::Level;
use crate::core::Millis;

/// Latch state of the motion gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionLatch {
    Idle,
    Triggered,
}

/// A motion episode that passed the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub at: Millis,
    pub sequence: u64,
}

/// Turns a noisy PIR output into discrete motion events.
///
/// An event fires when the signal is high, the latch is idle and at least
/// `cooldown_ms` has passed since the previous event. The latch only clears
/// once the signal is seen low, so one long episode yields one event.
#[derive(Debug, Clone)]
pub struct MotionGate {
    latch: MotionLatch,
    cooldown_ms: Millis,
    last_event: Option<Millis>,
    sequence: u64,
}

impl MotionGate {
    pub fn new(cooldown_ms: Millis) -> Self {
        Self {
            latch: MotionLatch::Idle,
            cooldown_ms,
            last_event: None,
            sequence: 0,
        }
    }

    pub fn latch(&self) -> MotionLatch {
        self.latch
    }

    pub fn last_event(&self) -> Option<Millis> {
        self.last_event
    }

    pub fn poll(&mut self, level: Level, now: Millis) -> Option<MotionEvent> {
        match (level, self.latch) {
            (Level::High, MotionLatch::Idle) => {
                if let Some(last) = self.last_event {
                    let since = now.saturating_sub(last);
                    if since < self.cooldown_ms {
                        let remaining = self.cooldown_ms - since;
                        trace!("Motion ignored, cooldown {} ms remaining", remaining);
                        return None;
                    }
                }

                self.latch = MotionLatch::Triggered;
                self.last_event = Some(now);
                self.sequence += 1;
                debug!("Motion event #{} at {} ms", self.sequence, now);

                Some(MotionEvent { at: now, sequence: self.sequence })
            }
            (Level::Low, MotionLatch::Triggered) => {
                self.latch = MotionLatch::Idle;
                None
            }
            _ => None,
        }
    }
}
