// src/serial/mod.rs
//! Serial transport for NMEA receivers

pub mod channel;
mod line_discipline;

pub use channel::{CloseHandle, SerialChannel};

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 4800;
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400];

/// Read buffer size for canonical line framing
pub const LINE_BUFFER_SIZE: usize = 255;

/// How bytes are grouped when reading from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framing {
    /// Line-oriented reads terminated by `\n`
    #[default]
    CanonicalLine,
    /// Reads of up to the given number of bytes
    RawByteCount(usize),
}

impl Framing {
    pub fn buffer_size(&self) -> usize {
        match self {
            Framing::CanonicalLine => LINE_BUFFER_SIZE,
            Framing::RawByteCount(n) => (*n).max(1),
        }
    }
}

/// Validated serial port settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    device_path: String,
    baud_rate: u32,
    framing: Framing,
    read_timeout: Option<Duration>,
}

impl SerialConfig {
    /// Build a configuration. An unsupported baud rate falls back to
    /// [`DEFAULT_BAUD_RATE`]; an empty device path falls back to [`DEFAULT_DEVICE_PATH`].
    pub fn new(device_path: &str, baud_rate: u32) -> Self {
        let device_path = if device_path.trim().is_empty() {
            tracing::warn!("No device path given, using {}", DEFAULT_DEVICE_PATH);
            DEFAULT_DEVICE_PATH.to_string()
        } else {
            device_path.to_string()
        };

        Self {
            device_path,
            baud_rate: Self::resolve_baud_rate(baud_rate),
            framing: Framing::default(),
            read_timeout: None,
        }
    }

    /// Set framing mode
    #[must_use]
    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the default timeout for line reads
    #[must_use]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn framing_mode(&self) -> Framing {
        self.framing
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn is_supported_baud_rate(baud_rate: u32) -> bool {
        SUPPORTED_BAUD_RATES.contains(&baud_rate)
    }

    fn resolve_baud_rate(requested: u32) -> u32 {
        if Self::is_supported_baud_rate(requested) {
            requested
        } else {
            tracing::warn!(
                "Unsupported baud rate {}, falling back to {}",
                requested,
                DEFAULT_BAUD_RATE
            );
            DEFAULT_BAUD_RATE
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_PATH, DEFAULT_BAUD_RATE)
    }
}
