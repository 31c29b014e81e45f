// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Display sinks

use anyhow::Result;
use tracing::info;

use super::{DisplaySink, Frame};

/// Writes each frame to the log, skipping repeats of the previous frame
#[derive(Debug, Default)]
pub struct LogDisplay {
    last: Option<Frame>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for LogDisplay {
    fn draw(&mut self, frame: &Frame) -> Result<()> {
        if self.last.as_ref() == Some(frame) {
            return Ok(());
        }

        let body: Vec<&str> = frame.lines[1..]
            .iter()
            .map(String::as_str)
            .filter(|l| !l.is_empty())
            .collect();
        info!("[display] {} | {}", frame.headline(), body.join(" | "));

        self.last = Some(frame.clone());
        Ok(())
    }
}
