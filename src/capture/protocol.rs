// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Camera link protocol - one capture session over a byte stream
//!
//! ```text
//! -> CAPTURE\n
//! <- OK\n | ERROR\n
//! <- SIZE:<decimal>\n
//! <- <exactly <decimal> raw bytes>
//! ```
//!
//! The session never sleeps or reads on its own. Callers feed it whatever
//! bytes arrived together with the current time, and every state carries its
//! own deadline. The body is taken as a fixed count right after the single
//! delimiter byte that ends the size digits; there is no resynchronisation if
//! the peer sends anything else in between.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::core::Millis;

/// Request sent to start a capture
pub const CAPTURE_COMMAND: &[u8] = b"CAPTURE\n";

/// Startup probe; a healthy peer answers `READY`
pub const PROBE_COMMAND: &[u8] = b"TEST\n";

/// Largest image the peer may announce
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 60_000;

// Longest status line or header token kept while scanning
const MAX_TOKEN_LEN: usize = 128;

/// Per-state deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimeouts {
    pub ack_ms: Millis,
    pub header_ms: Millis,
    pub body_ms: Millis,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            ack_ms: 5_000,
            header_ms: 10_000,
            body_ms: 10_000,
        }
    }
}

/// Why a capture session ended without an image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkFailure {
    #[error("camera did not acknowledge CAPTURE in time")]
    AckTimeout,

    #[error("camera reported ERROR")]
    PeerRejected,

    #[error("camera acknowledged but sent no SIZE header in time")]
    HeaderTimeout,

    #[error("announced image size {declared} outside 1..={max}")]
    SizeOutOfBounds { declared: u64, max: usize },

    #[error("incomplete transfer: {received}/{expected} bytes")]
    IncompleteTransfer { received: usize, expected: usize },
}

impl LinkFailure {
    /// Short label that fits a status line
    pub fn short_label(&self) -> &'static str {
        match self {
            LinkFailure::AckTimeout => "No response",
            LinkFailure::PeerRejected => "Camera error",
            LinkFailure::HeaderTimeout => "No header",
            LinkFailure::SizeOutOfBounds { .. } => "Bad size",
            LinkFailure::IncompleteTransfer { .. } => "Incomplete",
        }
    }
}

/// Capture session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingAck,
    AwaitingHeader,
    ReceivingBody,
    Complete,
    Failed(LinkFailure),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Failed(_))
    }
}

/// Input delivered to a session on each step
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    /// Bytes read from the link since the last step
    Bytes(&'a [u8]),
    /// Nothing arrived; only deadlines are evaluated
    Tick,
}

/// Fixed-capacity receive buffer for one image.
///
/// Only a capture session writes into it; uploaders get `as_slice()`.
#[derive(Debug)]
pub struct ImageBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl ImageBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Appends as much of `bytes` as fits, returns the count taken
    fn push_slice(&mut self, bytes: &[u8]) -> usize {
        let room = self.capacity - self.data.len();
        let n = room.min(bytes.len());
        self.data.extend_from_slice(&bytes[..n]);
        n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderScan {
    Token,
    Digits { value: u64, digits: usize },
}

/// One capture attempt. Not reusable: build a new session per attempt.
#[derive(Debug)]
pub struct CaptureSession {
    state: SessionState,
    timeouts: SessionTimeouts,
    max_image_size: usize,
    started_at: Millis,
    deadline: Millis,
    pending: Vec<u8>,
    scan: HeaderScan,
    expected: usize,
    received: usize,
}

impl CaptureSession {
    pub fn new(timeouts: SessionTimeouts, max_image_size: usize) -> Self {
        Self {
            state: SessionState::Idle,
            timeouts,
            max_image_size,
            started_at: 0,
            deadline: 0,
            pending: Vec::new(),
            scan: HeaderScan::Token,
            expected: 0,
            received: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn deadline(&self) -> Millis {
        self.deadline
    }

    pub fn started_at(&self) -> Millis {
        self.started_at
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received
    }

    /// Moves `Idle -> AwaitingAck` and returns the request to write.
    pub fn start(&mut self, now: Millis) -> &'static [u8] {
        if self.state == SessionState::Idle {
            self.started_at = now;
            self.deadline = now + self.timeouts.ack_ms;
            self.state = SessionState::AwaitingAck;
        }
        CAPTURE_COMMAND
    }

    /// Advances the session by one input at time `now`.
    ///
    /// The deadline of the current state is checked before any byte is
    /// looked at, so data arriving at or after the deadline is never used.
    pub fn step(
        &mut self,
        input: Input<'_>,
        image: &mut ImageBuffer,
        now: Millis,
    ) -> &SessionState {
        if self.state == SessionState::Idle || self.is_terminal() {
            return &self.state;
        }

        if now >= self.deadline {
            self.expire(image);
            return &self.state;
        }

        if let Input::Bytes(bytes) = input {
            let mut rest = bytes;
            while !rest.is_empty() && !self.is_terminal() {
                let used = match self.state {
                    SessionState::AwaitingAck => self.scan_ack(rest, now),
                    SessionState::AwaitingHeader => self.scan_header(rest, image, now),
                    SessionState::ReceivingBody => self.fill_body(rest, image),
                    _ => rest.len(),
                };
                rest = &rest[used..];
            }

            if !rest.is_empty() && self.state == SessionState::Complete {
                trace!("Ignoring {} bytes after image body", rest.len());
            }
        }

        &self.state
    }

    fn scan_ack(&mut self, bytes: &[u8], now: Millis) -> usize {
        for (i, &b) in bytes.iter().enumerate() {
            if b != b'\n' {
                push_bounded(&mut self.pending, b);
                continue;
            }

            let line = std::mem::take(&mut self.pending);
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();

            if text.contains("OK") {
                debug!("Camera acknowledged capture");
                self.scan = HeaderScan::Token;
                self.deadline = now + self.timeouts.header_ms;
                self.state = SessionState::AwaitingHeader;
                return i + 1;
            } else if text.contains("ERROR") {
                self.fail(LinkFailure::PeerRejected);
                return i + 1;
            }

            trace!("Ignoring camera line {:?}", text);
        }
        bytes.len()
    }

    fn scan_header(&mut self, bytes: &[u8], image: &mut ImageBuffer, now: Millis) -> usize {
        for (i, &b) in bytes.iter().enumerate() {
            match self.scan {
                HeaderScan::Token => {
                    if b == b':' {
                        let token = std::mem::take(&mut self.pending);
                        if token.windows(4).any(|w| w == b"SIZE") {
                            self.scan = HeaderScan::Digits { value: 0, digits: 0 };
                        } else {
                            trace!("Discarding header token {:?}", String::from_utf8_lossy(&token));
                        }
                    } else {
                        push_bounded(&mut self.pending, b);
                    }
                }
                HeaderScan::Digits { value, digits } => {
                    if b.is_ascii_digit() {
                        let value = value.saturating_mul(10).saturating_add(u64::from(b - b'0'));
                        self.scan = HeaderScan::Digits { value, digits: digits + 1 };
                    } else if digits == 0 && b == b' ' {
                        continue;
                    } else {
                        // `b` is the delimiter that ends the size field
                        self.finish_header(value, image, now);
                        return i + 1;
                    }
                }
            }
        }
        bytes.len()
    }

    fn finish_header(&mut self, declared: u64, image: &mut ImageBuffer, now: Millis) {
        let max = self.max_image_size.min(image.capacity());

        if declared == 0 || declared > max as u64 {
            self.fail(LinkFailure::SizeOutOfBounds { declared, max });
            return;
        }

        debug!("Camera announced {} byte image", declared);
        self.expected = declared as usize;
        self.received = 0;
        image.clear();
        self.deadline = now + self.timeouts.body_ms;
        self.state = SessionState::ReceivingBody;
    }

    fn fill_body(&mut self, bytes: &[u8], image: &mut ImageBuffer) -> usize {
        let want = (self.expected - self.received).min(bytes.len());
        self.received += image.push_slice(&bytes[..want]);

        if self.received == self.expected {
            debug!("Received complete image ({} bytes)", self.received);
            self.state = SessionState::Complete;
        }
        want
    }

    fn expire(&mut self, image: &mut ImageBuffer) {
        let failure = match self.state {
            SessionState::AwaitingAck => LinkFailure::AckTimeout,
            SessionState::AwaitingHeader => LinkFailure::HeaderTimeout,
            SessionState::ReceivingBody => {
                image.clear();
                LinkFailure::IncompleteTransfer {
                    received: self.received,
                    expected: self.expected,
                }
            }
            _ => return,
        };
        self.fail(failure);
    }

    fn fail(&mut self, failure: LinkFailure) {
        warn!("Capture session failed: {}", failure);
        self.pending.clear();
        self.state = SessionState::Failed(failure);
    }
}

fn push_bounded(buf: &mut Vec<u8>, b: u8) {
    if buf.len() >= MAX_TOKEN_LEN {
        buf.clear();
    }
    buf.push(b);
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

    fn session() -> (CaptureSession, ImageBuffer) {
        let mut s = CaptureSession::new(SessionTimeouts::default(), DEFAULT_MAX_IMAGE_SIZE);
        assert_eq!(s.start(0), CAPTURE_COMMAND);
        (s, ImageBuffer::with_capacity(DEFAULT_MAX_IMAGE_SIZE))
    }

    #[test]
    fn test_complete_in_one_chunk() {
        let (mut s, mut img) = session();
        let mut wire = b"OK\nSIZE:4\n".to_vec();
        wire.extend_from_slice(&JPEG);

        assert_eq!(s.step(Input::Bytes(&wire), &mut img, 10), &SessionState::Complete);
        assert_eq!(img.as_slice(), &JPEG);
    }

    #[test]
    fn test_complete_byte_by_byte() {
        let (mut s, mut img) = session();
        let mut wire = b"OK\r\nSIZE:4\n".to_vec();
        wire.extend_from_slice(&JPEG);

        for (t, b) in wire.iter().enumerate() {
            s.step(Input::Bytes(std::slice::from_ref(b)), &mut img, t as Millis);
        }
        assert_eq!(s.state(), &SessionState::Complete);
        assert_eq!(img.as_slice(), &JPEG);
    }

    #[test]
    fn test_state_progression() {
        let (mut s, mut img) = session();
        assert_eq!(s.state(), &SessionState::AwaitingAck);
        s.step(Input::Bytes(b"OK\n"), &mut img, 100);
        assert_eq!(s.state(), &SessionState::AwaitingHeader);
        assert_eq!(s.deadline(), 10_100);
        s.step(Input::Bytes(b"SIZE:3\n"), &mut img, 200);
        assert_eq!(s.state(), &SessionState::ReceivingBody);
        assert_eq!(s.expected(), 3);
        assert_eq!(s.deadline(), 10_200);
    }

    #[test]
    fn test_peer_rejected() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"ERROR\n"), &mut img, 50);
        assert_eq!(s.state(), &SessionState::Failed(LinkFailure::PeerRejected));
    }

    #[test]
    fn test_stray_lines_before_ack_are_ignored() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"READY\nbooting\n"), &mut img, 10);
        assert_eq!(s.state(), &SessionState::AwaitingAck);
        s.step(Input::Bytes(b"OK\n"), &mut img, 20);
        assert_eq!(s.state(), &SessionState::AwaitingHeader);
    }

    #[test]
    fn test_ack_timeout() {
        let (mut s, mut img) = session();
        s.step(Input::Tick, &mut img, 4_999);
        assert_eq!(s.state(), &SessionState::AwaitingAck);
        s.step(Input::Tick, &mut img, 5_000);
        assert_eq!(s.state(), &SessionState::Failed(LinkFailure::AckTimeout));
    }

    #[test]
    fn test_late_ack_is_not_used() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\n"), &mut img, 5_000);
        assert_eq!(s.state(), &SessionState::Failed(LinkFailure::AckTimeout));
    }

    #[test]
    fn test_header_timeout() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\n"), &mut img, 0);
        s.step(Input::Bytes(b"SIZ"), &mut img, 9_000);
        s.step(Input::Tick, &mut img, 10_000);
        assert_eq!(s.state(), &SessionState::Failed(LinkFailure::HeaderTimeout));
    }

    #[test]
    fn test_zero_size_rejected_before_body() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nSIZE:0\n\xFF\xD8"), &mut img, 0);
        assert_eq!(
            s.state(),
            &SessionState::Failed(LinkFailure::SizeOutOfBounds {
                declared: 0,
                max: DEFAULT_MAX_IMAGE_SIZE,
            })
        );
        assert_eq!(s.received(), 0);
        assert!(img.is_empty());
    }

    #[test]
    fn test_oversized_rejected_before_body() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nSIZE:60001\n"), &mut img, 0);
        assert!(matches!(
            s.state(),
            SessionState::Failed(LinkFailure::SizeOutOfBounds { declared: 60_001, .. })
        ));
        assert_eq!(s.expected(), 0);
    }

    #[test]
    fn test_absurd_size_saturates_and_fails() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nSIZE:99999999999999999999999\n"), &mut img, 0);
        assert!(matches!(s.state(), SessionState::Failed(LinkFailure::SizeOutOfBounds { .. })));
    }

    #[test]
    fn test_max_size_is_accepted() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nSIZE:60000\n"), &mut img, 0);
        assert_eq!(s.state(), &SessionState::ReceivingBody);
        let body = vec![0xAB; 60_000];
        s.step(Input::Bytes(&body), &mut img, 1);
        assert_eq!(s.state(), &SessionState::Complete);
        assert_eq!(img.len(), 60_000);
    }

    #[test]
    fn test_non_size_token_is_skipped() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nDEBUG:SIZE:2\n\x01\x02"), &mut img, 0);
        assert_eq!(s.state(), &SessionState::Complete);
        assert_eq!(img.as_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_incomplete_transfer_discards_partial() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nSIZE:4\n\xFF\xD8"), &mut img, 100);
        assert_eq!(s.received(), 2);
        s.step(Input::Tick, &mut img, 10_100);
        assert_eq!(
            s.state(),
            &SessionState::Failed(LinkFailure::IncompleteTransfer { received: 2, expected: 4 })
        );
        assert!(img.is_empty());
    }

    #[test]
    fn test_trailing_bytes_are_not_buffered() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"OK\nSIZE:2\n\x01\x02\x03\x04"), &mut img, 0);
        assert_eq!(s.state(), &SessionState::Complete);
        assert_eq!(img.as_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_terminal_session_ignores_input() {
        let (mut s, mut img) = session();
        s.step(Input::Bytes(b"ERROR\n"), &mut img, 0);
        s.step(Input::Bytes(b"OK\nSIZE:1\n\x00"), &mut img, 1);
        assert_eq!(s.state(), &SessionState::Failed(LinkFailure::PeerRejected));
    }

    #[test]
    fn test_idle_session_ignores_input() {
        let mut s = CaptureSession::new(SessionTimeouts::default(), DEFAULT_MAX_IMAGE_SIZE);
        let mut img = ImageBuffer::with_capacity(16);
        s.step(Input::Bytes(b"OK\n"), &mut img, 0);
        s.step(Input::Tick, &mut img, 60_000);
        assert_eq!(s.state(), &SessionState::Idle);
    }

    #[test]
    fn test_buffer_capacity_caps_size() {
        let mut s = CaptureSession::new(SessionTimeouts::default(), DEFAULT_MAX_IMAGE_SIZE);
        let mut img = ImageBuffer::with_capacity(8);
        s.start(0);
        s.step(Input::Bytes(b"OK\nSIZE:9\n"), &mut img, 0);
        assert_eq!(
            s.state(),
            &SessionState::Failed(LinkFailure::SizeOutOfBounds { declared: 9, max: 8 })
        );
    }
}
