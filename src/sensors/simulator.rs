// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Simulated PIR/button inputs and a log-backed indicator for demo runs

use rand::prelude::*;
use rand_distr::Uniform;
use tracing::{debug, info};

use super::{Indicator, InputPins, Level};
use crate::config::SimulatorConfig;
use crate::core::{Clock, Millis};

/// Generates plausible motion episodes and the odd button press
pub struct SimulatedInputs {
    clock: Clock,
    rng: StdRng,
    motion_probability: f64,
    press_probability: f64,
    episode_len: Uniform<Millis>,
    episode_until: Option<Millis>,
}

impl SimulatedInputs {
    pub fn new(config: &SimulatorConfig, clock: Clock) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let lo = config.episode_min_ms.min(config.episode_max_ms);
        let hi = config.episode_min_ms.max(config.episode_max_ms);

        Self {
            clock,
            rng,
            motion_probability: config.motion_probability.clamp(0.0, 1.0),
            press_probability: config.press_probability.clamp(0.0, 1.0),
            episode_len: Uniform::new_inclusive(lo, hi),
            episode_until: None,
        }
    }
}

impl InputPins for SimulatedInputs {
    fn switch_level(&mut self) -> Level {
        if self.rng.gen::<f64>() < self.press_probability {
            debug!("Simulated button press");
            Level::Low
        } else {
            Level::High
        }
    }

    fn motion_level(&mut self) -> Level {
        let now = self.clock.now();

        match self.episode_until {
            Some(until) if now < until => Level::High,
            _ => {
                self.episode_until = None;
                if self.rng.gen::<f64>() < self.motion_probability {
                    let len = self.rng.sample(self.episode_len);
                    self.episode_until = Some(now + len);
                    debug!("Simulated motion episode for {} ms", len);
                    Level::High
                } else {
                    Level::Low
                }
            }
        }
    }
}

/// Indicator that only reports its transitions to the log
#[derive(Debug, Default)]
pub struct LogIndicator {
    active: bool,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indicator for LogIndicator {
    fn set_active(&mut self, active: bool) {
        if active != self.active {
            info!("Indicator {}", if active { "ON" } else { "OFF" });
        }
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
