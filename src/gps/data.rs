// src/gps/data.rs
//! GGA fix data structures

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Reported in `last_dgps_update_seconds` when the DGPS age field is empty
pub const DGPS_AGE_UNAVAILABLE: f64 = -1.0;

/// UTC time of fix, as carried in GGA field 1 (`hhmmss.sss`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTime {
    raw_value: u32,
    hours: u8,
    minutes: u8,
    seconds: u8,
}

impl UtcTime {
    /// Build from the six-digit integer part of the time field.
    /// Returns `None` when the components are out of range.
    pub fn from_raw(raw_value: u32) -> Option<Self> {
        let hours = raw_value / 10_000;
        let minutes = (raw_value / 100) % 100;
        let seconds = raw_value % 100;
        if hours > 23 || minutes > 59 || seconds > 59 {
            return None;
        }
        Some(Self {
            raw_value,
            hours: hours as u8,
            minutes: minutes as u8,
            seconds: seconds as u8,
        })
    }

    pub fn raw_value(&self) -> u32 {
        self.raw_value
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hours.into(), self.minutes.into(), self.seconds.into())
    }
}

/// GGA fix quality indicator (field 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixQuality {
    NoFix,
    Gps,
    Dgps,
    Pps,
    Rtk,
    FloatRtk,
    Estimated,
    Manual,
    Simulation,
    /// Indicator outside the known set, kept as received
    Other(u8),
}

impl FixQuality {
    pub fn value(&self) -> u8 {
        match self {
            FixQuality::NoFix => 0,
            FixQuality::Gps => 1,
            FixQuality::Dgps => 2,
            FixQuality::Pps => 3,
            FixQuality::Rtk => 4,
            FixQuality::FloatRtk => 5,
            FixQuality::Estimated => 6,
            FixQuality::Manual => 7,
            FixQuality::Simulation => 8,
            FixQuality::Other(v) => *v,
        }
    }

    pub fn has_fix(&self) -> bool {
        !matches!(self, FixQuality::NoFix)
    }

    /// Get fix type description
    pub fn description(&self) -> String {
        match self {
            FixQuality::NoFix => "No fix".to_string(),
            FixQuality::Gps => "GPS".to_string(),
            FixQuality::Dgps => "DGPS".to_string(),
            FixQuality::Pps => "PPS".to_string(),
            FixQuality::Rtk => "RTK".to_string(),
            FixQuality::FloatRtk => "Float RTK".to_string(),
            FixQuality::Estimated => "Estimated".to_string(),
            FixQuality::Manual => "Manual".to_string(),
            FixQuality::Simulation => "Simulation".to_string(),
            FixQuality::Other(v) => format!("Unknown ({})", v),
        }
    }
}

impl From<u8> for FixQuality {
    fn from(v: u8) -> Self {
        match v {
            0 => FixQuality::NoFix,
            1 => FixQuality::Gps,
            2 => FixQuality::Dgps,
            3 => FixQuality::Pps,
            4 => FixQuality::Rtk,
            5 => FixQuality::FloatRtk,
            6 => FixQuality::Estimated,
            7 => FixQuality::Manual,
            8 => FixQuality::Simulation,
            other => FixQuality::Other(other),
        }
    }
}

/// A latitude/longitude pair in signed decimal degrees (south and west negative)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One decoded GPGGA sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub time: UtcTime,
    pub latitude: f64,
    pub latitude_hemisphere: char,
    pub longitude: f64,
    pub longitude_hemisphere: char,
    pub fix_quality: FixQuality,
    pub satellites_in_view: u8,
    pub horizontal_dilution: f64,
    pub altitude_meters: f64,
    pub geoid_separation_meters: f64,
    /// Seconds since the last DGPS update, or [`DGPS_AGE_UNAVAILABLE`]
    pub last_dgps_update_seconds: f64,
    pub dgps_station_id: Option<u16>,
    pub sentence_checksum: u8,
}

impl FixRecord {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// DGPS age, if the receiver reported one
    pub fn dgps_age(&self) -> Option<f64> {
        if self.last_dgps_update_seconds < 0.0 {
            None
        } else {
            Some(self.last_dgps_update_seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_time_components() {
        let t = UtcTime::from_raw(30059).unwrap();
        assert_eq!(t.hours(), 3);
        assert_eq!(t.minutes(), 0);
        assert_eq!(t.seconds(), 59);
        assert_eq!(
            u32::from(t.hours()) * 10_000 + u32::from(t.minutes()) * 100 + u32::from(t.seconds()),
            t.raw_value()
        );
        assert_eq!(t.to_naive_time(), NaiveTime::from_hms_opt(3, 0, 59));
    }

    #[test]
    fn test_utc_time_out_of_range() {
        assert!(UtcTime::from_raw(240000).is_none());
        assert!(UtcTime::from_raw(126000).is_none());
        assert!(UtcTime::from_raw(120060).is_none());
        assert!(UtcTime::from_raw(235959).is_some());
    }

    #[test]
    fn test_fix_quality_keeps_unknown_values() {
        assert_eq!(FixQuality::from(2), FixQuality::Dgps);
        assert_eq!(FixQuality::from(42), FixQuality::Other(42));
        assert_eq!(FixQuality::from(42).value(), 42);
        assert_eq!(FixQuality::from(42).description(), "Unknown (42)");
        assert!(!FixQuality::NoFix.has_fix());
    }
}
