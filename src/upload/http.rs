// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! HTTP uploader

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{Network, UploadOutcome, Uploader};
use crate::capture::Payload;
use crate::config::ServerConfig;

/// JSON reply of either server flavour. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerReply {
    pub status: Option<String>,
    pub success: Option<bool>,
    pub message: Option<String>,
    pub filename: Option<String>,
    pub size: Option<u64>,
}

/// Single POST per attempt with a bounded wait for the status line
pub struct HttpUploader {
    client: reqwest::Client,
    network: Arc<dyn Network>,
    attempts: u64,
}

impl HttpUploader {
    pub fn new(server: &ServerConfig, network: Arc<dyn Network>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(server.connect_timeout_ms))
            .timeout(Duration::from_millis(server.response_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            network,
            attempts: 0,
        })
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn send(&mut self, payload: &Payload<'_>, destination: &str) -> UploadOutcome {
        if !self.network.is_connected() {
            warn!("Network not connected, skipping upload");
            return UploadOutcome::NetworkUnavailable;
        }

        self.attempts += 1;
        let request = self
            .client
            .post(destination)
            .header(CONTENT_TYPE, payload.content_type());
        let request = match payload {
            Payload::Image(bytes) => {
                info!("Uploading {} byte image to {}", bytes.len(), destination);
                request.body(bytes.to_vec())
            }
            Payload::Trigger(body) => {
                info!("Sending capture trigger to {}", destination);
                request.json(body)
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timeout: {}", e)
                } else {
                    e.to_string()
                };
                warn!("HTTP POST failed: {}", reason);
                return UploadOutcome::TransportFailure(reason);
            }
        };

        let status = response.status().as_u16();
        info!("HTTP response code: {}", status);

        match response.text().await {
            Ok(text) => match serde_json::from_str::<ServerReply>(&text) {
                Ok(reply) => debug!(
                    "Server reply: status={:?} success={:?} message={:?} file={:?} size={:?}",
                    reply.status, reply.success, reply.message, reply.filename, reply.size
                ),
                Err(_) => debug!("Server reply: {}", text),
            },
            Err(e) => debug!("Could not read response body: {}", e),
        }

        UploadOutcome::from_status(status)
    }
}
