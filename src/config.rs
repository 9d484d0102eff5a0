// src/config.rs
//! Persisted receiver configuration

use crate::error::{GpsError, Result};
use crate::gps::data::GeoPoint;
use crate::serial::{Framing, SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reference point used when none is configured (Las Vegas, NV)
pub const DEFAULT_REFERENCE: GeoPoint = GeoPoint {
    latitude: 36.1699412,
    longitude: -115.139829,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub device_path: String,
    pub baud_rate: u32,
    /// Line-oriented reads; when false, reads use `raw_read_size` byte chunks
    pub canonical: bool,
    pub raw_read_size: usize,
    pub read_timeout_ms: Option<u64>,
    pub reference_latitude: f64,
    pub reference_longitude: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            device_path: DEFAULT_DEVICE_PATH.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            canonical: true,
            raw_read_size: 82,
            read_timeout_ms: None,
            reference_latitude: DEFAULT_REFERENCE.latitude,
            reference_longitude: DEFAULT_REFERENCE.longitude,
        }
    }
}

impl ReceiverConfig {
    /// Load configuration from the user's config file, or defaults if there is none
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the user's config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GpsError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|e| GpsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Config file path: `$HOME/.config/gga-fix/config.json`
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gga-fix")
            .join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.reference_latitude) {
            return Err(GpsError::Config(format!(
                "Reference latitude {} outside -90..90",
                self.reference_latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.reference_longitude) {
            return Err(GpsError::Config(format!(
                "Reference longitude {} outside -180..180",
                self.reference_longitude
            )));
        }
        Ok(())
    }

    pub fn reference(&self) -> GeoPoint {
        GeoPoint::new(self.reference_latitude, self.reference_longitude)
    }

    /// Update the reference point
    pub fn update_reference(&mut self, reference: GeoPoint) {
        self.reference_latitude = reference.latitude;
        self.reference_longitude = reference.longitude;
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, device_path: String, baud_rate: u32) {
        self.device_path = device_path;
        self.baud_rate = baud_rate;
    }

    /// Serial settings for opening the channel; unsupported baud rates fall back here
    pub fn serial_config(&self) -> SerialConfig {
        let framing = if self.canonical {
            Framing::CanonicalLine
        } else {
            Framing::RawByteCount(self.raw_read_size)
        };

        SerialConfig::new(&self.device_path, self.baud_rate)
            .framing(framing)
            .read_timeout(self.read_timeout_ms.map(Duration::from_millis))
    }
}

/// Parse `LAT,LON` in decimal degrees
pub fn parse_reference(value: &str) -> Result<GeoPoint> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| GpsError::Config(format!("Expected LAT,LON, got {:?}", value)))?;

    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| GpsError::Config(format!("Invalid latitude {:?}", lat)))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|_| GpsError::Config(format!("Invalid longitude {:?}", lon)))?;

    let mut config = ReceiverConfig::default();
    config.update_reference(GeoPoint::new(latitude, longitude));
    config.validate()?;

    Ok(config.reference())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReceiverConfig::default();
        assert_eq!(config.device_path, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 4800);
        assert!(config.canonical);
        assert_eq!(config.reference(), DEFAULT_REFERENCE);
    }

    #[test]
    fn test_update_serial() {
        let mut config = ReceiverConfig::default();
        config.update_serial("/dev/ttyACM0".to_string(), 115200);
        let serial = config.serial_config();
        assert_eq!(serial.device_path(), "/dev/ttyACM0");
        assert_eq!(serial.baud_rate(), 115200);
    }

    #[test]
    fn test_serial_config_applies_fallback_and_framing() {
        let config = ReceiverConfig {
            baud_rate: 1234,
            canonical: false,
            raw_read_size: 64,
            read_timeout_ms: Some(1500),
            ..ReceiverConfig::default()
        };
        let serial = config.serial_config();
        assert_eq!(serial.baud_rate(), 4800);
        assert_eq!(serial.framing_mode(), Framing::RawByteCount(64));
        assert_eq!(serial.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = ReceiverConfig::default();
        config.update_serial("/dev/ttyS1".to_string(), 9600);
        config.update_reference(GeoPoint::new(-33.87, 151.21));
        config.save_to(&path).unwrap();

        let loaded = ReceiverConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ReceiverConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, ReceiverConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"device_path":"/dev/ttyUSB3"}"#).unwrap();

        let loaded = ReceiverConfig::load_from(&path).unwrap();
        assert_eq!(loaded.device_path, "/dev/ttyUSB3");
        assert_eq!(loaded.baud_rate, 4800);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"reference_latitude": 91.0}"#).unwrap();
        assert!(matches!(ReceiverConfig::load_from(&path), Err(GpsError::Config(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(ReceiverConfig::load_from(&path), Err(GpsError::Config(_))));
    }

    #[test]
    fn test_parse_reference() {
        let p = parse_reference("36.1699412, -115.139829").unwrap();
        assert_eq!(p, DEFAULT_REFERENCE);
        assert!(parse_reference("36.1").is_err());
        assert!(parse_reference("north,west").is_err());
        assert!(parse_reference("95,0").is_err());
    }
}
