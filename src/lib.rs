// src/lib.rs
//! GGA Fix Library
//!
//! Reads NMEA-0183 GPGGA sentences from a serial GPS receiver, verifies and decodes
//! them into fix records, and computes great-circle distance and bearing.

pub mod config;
pub mod error;
pub mod gps;
pub mod monitor;
pub mod report;
pub mod serial;

// Re-export main types for convenience
pub use error::{GpsError, Result};
pub use gps::{FixRecord, GeoPoint};
pub use monitor::{FixMonitor, FixWorker};
pub use serial::{SerialChannel, SerialConfig};
