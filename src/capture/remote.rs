// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Capture backend that asks a networked camera server to take the picture

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{CaptureBackend, CaptureError, Payload, ProbeStatus, TriggerRequest};
use crate::config::ServerConfig;

/// Reply of the camera server's `GET /status`
#[derive(Debug, Clone, Deserialize)]
pub struct CameraServerStatus {
    pub webcam: String,
    #[serde(default)]
    pub total_images: u64,
}

/// No bytes travel over this backend; `acquire` only yields a trigger
pub struct RemoteTriggerBackend {
    client: reqwest::Client,
    status_url: String,
    source: String,
    triggers: u64,
}

impl RemoteTriggerBackend {
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(server.connect_timeout_ms))
            .timeout(Duration::from_millis(server.response_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            status_url: server.url(&server.status_path),
            source: server.source.clone(),
            triggers: 0,
        })
    }

    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    async fn fetch_status(&self) -> Result<CameraServerStatus> {
        let status = self
            .client
            .get(&self.status_url)
            .send()
            .await?
            .error_for_status()?
            .json::<CameraServerStatus>()
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl CaptureBackend for RemoteTriggerBackend {
    fn name(&self) -> &str {
        "remote-trigger"
    }

    async fn probe(&mut self) -> ProbeStatus {
        info!("Probing camera server at {}", self.status_url);
        match self.fetch_status().await {
            Ok(status) if status.webcam == "OK" => {
                info!("Camera server ready ({} images stored)", status.total_images);
                ProbeStatus::Ready
            }
            Ok(status) => {
                warn!("Camera server reports webcam {:?}", status.webcam);
                ProbeStatus::Unexpected(format!("webcam {}", status.webcam))
            }
            Err(e) => {
                warn!("Camera server not reachable: {}", e);
                ProbeStatus::Silent
            }
        }
    }

    async fn acquire<'a>(&'a mut self) -> Result<Payload<'a>, CaptureError> {
        self.triggers += 1;
        info!("Requesting remote capture #{}", self.triggers);
        Ok(Payload::Trigger(TriggerRequest {
            source: self.source.clone(),
            motion: true,
        }))
    }
}
