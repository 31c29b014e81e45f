// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Network connectivity checks

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::debug;

/// Answers "could an upload leave this device right now?"
pub trait Network: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Local address used to reach the server, if known
    fn local_address(&self) -> Option<String>;
}

/// Connectivity as seen from a host OS.
///
/// Connected means a route to the server exists: a UDP socket can be
/// connected toward it (no datagram is sent) and a local address is bound.
#[derive(Debug, Clone)]
pub struct HostNetwork {
    target: String,
}

impl HostNetwork {
    /// `server_url` must carry a host; the port defaults to 80
    pub fn new(server_url: &str) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(server_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("server URL {} has no host", server_url))?;
        let port = url.port_or_known_default().unwrap_or(80);

        Ok(Self {
            target: format!("{}:{}", host, port),
        })
    }

    fn route(&self) -> Option<SocketAddr> {
        let remote = self.target.to_socket_addrs().ok()?.next()?;
        let bind = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind).ok()?;
        socket.connect(remote).ok()?;
        let local = socket.local_addr().ok()?;
        debug!("Route to {} via {}", remote, local);
        Some(local)
    }
}

impl Network for HostNetwork {
    fn is_connected(&self) -> bool {
        self.route().is_some()
    }

    fn local_address(&self) -> Option<String> {
        self.route().map(|addr| addr.ip().to_string())
    }
}

/// Fixed answer, for demo runs and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticNetwork {
    pub connected: bool,
}

impl Network for StaticNetwork {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn local_address(&self) -> Option<String> {
        self.connected.then(|| "127.0.0.1".to_string())
    }
}
