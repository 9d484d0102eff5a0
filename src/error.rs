// src/error.rs
//! Error types for GGA fix acquisition

use std::fmt;

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug)]
pub enum GpsError {
    /// Device path missing or not openable for read/write
    DeviceUnavailable { path: String, reason: String },
    /// OS-level read error; the channel is presumed unusable afterwards
    ReadFailed(std::io::Error),
    /// OS-level write error
    WriteFailed(std::io::Error),
    /// Sentence integrity failure
    ChecksumMismatch { expected: Option<u8>, computed: u8 },
    /// Field-level decode failure, with the field index and raw text
    MalformedSentence { field: usize, reason: String },
    Serial(tokio_serial::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(String),
    Other(String),
}

impl GpsError {
    pub(crate) fn malformed(field: usize, reason: impl Into<String>) -> Self {
        GpsError::MalformedSentence {
            field,
            reason: reason.into(),
        }
    }

    /// True for failures that only invalidate one sentence; the channel is still usable.
    pub fn is_sentence_error(&self) -> bool {
        matches!(
            self,
            GpsError::ChecksumMismatch { .. } | GpsError::MalformedSentence { .. }
        )
    }
}

impl fmt::Display for GpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpsError::DeviceUnavailable { path, reason } => {
                write!(f, "Device {} unavailable: {}", path, reason)
            }
            GpsError::ReadFailed(e) => write!(f, "Read failed: {}", e),
            GpsError::WriteFailed(e) => write!(f, "Write failed: {}", e),
            GpsError::ChecksumMismatch {
                expected: Some(expected),
                computed,
            } => write!(
                f,
                "Checksum mismatch: sentence says {:02X}, computed {:02X}",
                expected, computed
            ),
            GpsError::ChecksumMismatch {
                expected: None,
                computed,
            } => write!(
                f,
                "Checksum mismatch: no valid checksum field (computed {:02X})",
                computed
            ),
            GpsError::MalformedSentence { field, reason } => {
                write!(f, "Malformed sentence at field {}: {}", field, reason)
            }
            GpsError::Serial(e) => write!(f, "Serial error: {}", e),
            GpsError::Io(e) => write!(f, "IO error: {}", e),
            GpsError::Json(e) => write!(f, "JSON error: {}", e),
            GpsError::Config(msg) => write!(f, "Configuration error: {}", msg),
            GpsError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GpsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpsError::ReadFailed(e) | GpsError::WriteFailed(e) | GpsError::Io(e) => Some(e),
            GpsError::Serial(e) => Some(e),
            GpsError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GpsError {
    fn from(error: std::io::Error) -> Self {
        GpsError::Io(error)
    }
}

impl From<tokio_serial::Error> for GpsError {
    fn from(error: tokio_serial::Error) -> Self {
        GpsError::Serial(error)
    }
}

impl From<serde_json::Error> for GpsError {
    fn from(error: serde_json::Error) -> Self {
        GpsError::Json(error)
    }
}
