// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Monotonic millisecond clock for the control loop

use std::time::Duration;
use tokio::time::Instant;

/// Milliseconds since the clock was started
pub type Millis = u64;

/// Millisecond clock anchored at process start, like a firmware `millis()`.
///
/// Built on `tokio::time::Instant` so paused-time tests drive it without
/// real delays.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self { origin: Instant::now() }
    }

    pub fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }

    pub async fn sleep(&self, ms: Millis) {
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}
