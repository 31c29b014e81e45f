// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Capture backend for a camera board attached over a byte link

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    CaptureBackend, CaptureError, CaptureSession, DeviceLink, ImageBuffer, Input, Payload,
    ProbeStatus, SessionState, SessionTimeouts, PROBE_COMMAND,
};
use crate::config::LinkConfig;
use crate::core::{Clock, Millis};

const READ_CHUNK: usize = 1024;

/// Drives [`CaptureSession`]s over a [`DeviceLink`] and owns the image buffer
pub struct DeviceLinkBackend<L: DeviceLink> {
    link: L,
    clock: Clock,
    image: ImageBuffer,
    read_buf: Vec<u8>,
    timeouts: SessionTimeouts,
    max_image_size: usize,
    poll_interval_ms: Millis,
    probe_wait_ms: Millis,
    sessions: u64,
}

impl<L: DeviceLink> DeviceLinkBackend<L> {
    pub fn new(link: L, config: &LinkConfig, clock: Clock) -> Self {
        Self {
            link,
            clock,
            image: ImageBuffer::with_capacity(config.max_image_size),
            read_buf: vec![0u8; READ_CHUNK],
            timeouts: config.timeouts(),
            max_image_size: config.max_image_size,
            poll_interval_ms: config.poll_interval_ms.max(1),
            probe_wait_ms: config.probe_wait_ms,
            sessions: 0,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    /// Runs a fresh session until it completes or fails; returns the image size
    async fn run_session(&mut self) -> Result<usize, CaptureError> {
        self.sessions += 1;
        let mut session = CaptureSession::new(self.timeouts, self.max_image_size);
        let request = session.start(self.clock.now());

        info!("Requesting capture #{} over {}", self.sessions, self.link.describe());
        self.link.write_all(request)?;

        loop {
            let n = self.link.read_available(&mut self.read_buf)?;
            let input = if n == 0 {
                Input::Tick
            } else {
                Input::Bytes(&self.read_buf[..n])
            };

            let now = self.clock.now();
            let elapsed = now - session.started_at();
            match session.step(input, &mut self.image, now).clone() {
                SessionState::Complete => {
                    info!(
                        "Capture #{} complete: {} bytes in {} ms",
                        self.sessions,
                        self.image.len(),
                        elapsed
                    );
                    return Ok(self.image.len());
                }
                SessionState::Failed(failure) => {
                    debug!("Capture #{} gave up after {} ms", self.sessions, elapsed);
                    return Err(failure.into());
                }
                _ => {}
            }

            if n == 0 {
                self.clock.sleep(self.poll_interval_ms).await;
            }
        }
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut collected = Vec::new();
        loop {
            let n = self.link.read_available(&mut self.read_buf)?;
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&self.read_buf[..n]);
        }

        if collected.is_empty() {
            return Ok(None);
        }

        let line = collected.split(|&b| b == b'\n').next().unwrap_or_default();
        Ok(Some(String::from_utf8_lossy(line).trim().to_string()))
    }
}

#[async_trait]
impl<L: DeviceLink> CaptureBackend for DeviceLinkBackend<L> {
    fn name(&self) -> &str {
        "device-link"
    }

    async fn probe(&mut self) -> ProbeStatus {
        info!("Probing camera over {}", self.link.describe());
        if let Err(e) = self.link.write_all(PROBE_COMMAND) {
            warn!("Camera probe write failed: {}", e);
            return ProbeStatus::Silent;
        }

        self.clock.sleep(self.probe_wait_ms).await;

        match self.read_line() {
            Ok(Some(line)) if line.contains("READY") => {
                info!("Camera connected");
                ProbeStatus::Ready
            }
            Ok(Some(line)) => {
                warn!("Camera answered with unexpected status {:?}", line);
                ProbeStatus::Unexpected(line)
            }
            Ok(None) => {
                warn!("Camera not responding; check wiring and firmware");
                ProbeStatus::Silent
            }
            Err(e) => {
                warn!("Camera probe read failed: {}", e);
                ProbeStatus::Silent
            }
        }
    }

    async fn acquire<'a>(&'a mut self) -> Result<Payload<'a>, CaptureError> {
        if let Err(e) = self.run_session().await {
            self.image.clear();
            return Err(e);
        }
        Ok(Payload::Image(self.image.as_slice()))
    }
}
