// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! Byte-stream link to the camera peer

use std::io;

/// Raw duplex byte link to the camera board.
///
/// Reads must not block: return `Ok(0)` when nothing is waiting. Deadlines
/// are enforced by the caller, never by the link.
pub trait DeviceLink: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn describe(&self) -> String;
}

#[cfg(feature = "serial")]
pub use serial::SerialLink;

#[cfg(feature = "serial")]
mod serial {
    use std::io::{self, Read, Write};
    use std::time::Duration;

    use serialport::SerialPort;
    use tracing::info;

    use super::DeviceLink;

    /// UART link, 8N1
    pub struct SerialLink {
        name: String,
        port: Box<dyn SerialPort>,
    }

    impl SerialLink {
        pub fn open(name: &str, baud_rate: u32) -> io::Result<Self> {
            let port = serialport::new(name, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(Duration::from_millis(1))
                .open()
                .map_err(io::Error::from)?;

            info!("Opened serial link {} at {} baud", name, baud_rate);
            Ok(Self {
                name: name.to_string(),
                port,
            })
        }
    }

    impl DeviceLink for SerialLink {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.port.write_all(bytes)?;
            self.port.flush()
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let waiting = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
            if waiting == 0 {
                return Ok(0);
            }

            let n = waiting.min(buf.len());
            match self.port.read(&mut buf[..n]) {
                Ok(read) => Ok(read),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
                Err(e) => Err(e),
            }
        }

        fn describe(&self) -> String {
            format!("serial {}", self.name)
        }
    }
}
