// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Simulated camera board speaking the device-link protocol

use std::collections::VecDeque;
use std::io;

use rand::prelude::*;
use rand_distr::Uniform;
use tracing::debug;

use super::DeviceLink;
use crate::config::SimulatorConfig;

/// In-process stand-in for the serial camera board.
///
/// Answers `TEST` with `READY` and `CAPTURE` with a synthetic JPEG, handing
/// the reply out in random-sized chunks the way a UART FIFO would.
pub struct SimulatedCamera {
    rng: StdRng,
    line: Vec<u8>,
    outbox: VecDeque<u8>,
    image_size: Uniform<usize>,
    chunk_size: Uniform<usize>,
    failure_probability: f64,
    captures: u64,
}

impl SimulatedCamera {
    pub fn new(config: &SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let lo = config.image_min_bytes.max(4);
        let hi = config.image_max_bytes.max(lo);

        Self {
            rng,
            line: Vec::new(),
            outbox: VecDeque::new(),
            image_size: Uniform::new_inclusive(lo, hi),
            chunk_size: Uniform::new_inclusive(1, config.max_chunk_bytes.max(1)),
            failure_probability: config.camera_failure_probability.clamp(0.0, 1.0),
            captures: 0,
        }
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    fn handle_line(&mut self, line: &str) {
        match line {
            "TEST" => self.outbox.extend(b"READY\n"),
            "CAPTURE" => {
                self.captures += 1;
                if self.rng.gen::<f64>() < self.failure_probability {
                    debug!("Simulated camera failing capture #{}", self.captures);
                    self.outbox.extend(b"ERROR\n");
                    return;
                }

                let image = self.synthetic_jpeg();
                debug!("Simulated camera sending {} bytes", image.len());
                self.outbox.extend(b"OK\n");
                self.outbox.extend(format!("SIZE:{}\n", image.len()).as_bytes());
                self.outbox.extend(image);
            }
            other => debug!("Simulated camera ignoring {:?}", other),
        }
    }

    fn synthetic_jpeg(&mut self) -> Vec<u8> {
        let len = self.rng.sample(self.image_size);
        let mut image = vec![0u8; len];
        self.rng.fill_bytes(&mut image[2..len - 2]);
        image[..2].copy_from_slice(&[0xFF, 0xD8]);
        image[len - 2..].copy_from_slice(&[0xFF, 0xD9]);
        image
    }
}

impl DeviceLink for SimulatedCamera {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            if b == b'\n' {
                let line = std::mem::take(&mut self.line);
                let text = String::from_utf8_lossy(&line).trim().to_string();
                self.handle_line(&text);
            } else {
                self.line.push(b);
            }
        }
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.outbox.is_empty() || buf.is_empty() {
            return Ok(0);
        }

        let n = self.rng.sample(self.chunk_size).min(buf.len()).min(self.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn describe(&self) -> String {
        "simulated camera".to_string()
    }
}
