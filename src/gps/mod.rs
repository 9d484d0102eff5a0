// src/gps/mod.rs
//! GGA sentence handling: framing, checksum, decoding, and geodesy

pub mod checksum;
pub mod data;
pub mod framer;
pub mod geodesy;
pub mod nmea;

pub use data::{FixQuality, FixRecord, GeoPoint, UtcTime};
