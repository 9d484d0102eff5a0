// src/report.rs
//! Text and JSON rendering of decoded fixes

use crate::{
    error::Result,
    gps::{
        data::{FixRecord, GeoPoint},
        geodesy,
    },
};
use chrono::{DateTime, Utc};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use serde::Serialize;
use std::io::Write;

/// Great-circle leg from a fix to the reference point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Leg {
    pub reference: GeoPoint,
    pub distance_km: f64,
    /// As computed, `atan2 + 360`
    pub bearing_degrees: f64,
    /// Normalized to 0..360
    pub compass_bearing: f64,
}

impl Leg {
    pub fn between(from: GeoPoint, reference: GeoPoint) -> Self {
        let bearing_degrees = geodesy::bearing_degrees(from, reference);
        Self {
            reference,
            distance_km: geodesy::distance_km(from, reference),
            bearing_degrees,
            compass_bearing: geodesy::normalize_bearing(bearing_degrees),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub received_at: DateTime<Utc>,
    pub fix: FixRecord,
    pub leg: Leg,
}

impl FixReport {
    pub fn new(fix: FixRecord, reference: GeoPoint) -> Self {
        let leg = Leg::between(fix.position(), reference);
        Self {
            received_at: Utc::now(),
            fix,
            leg,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Write a human-readable report
pub fn render_text(out: &mut impl Write, report: &FixReport) -> Result<()> {
    let fix = &report.fix;

    execute!(
        out,
        SetForegroundColor(Color::Green),
        Print("=".repeat(40)),
        Print("\n"),
        Print(format!(
            "GGA fix received {}\n",
            report.received_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        Print("=".repeat(40)),
        Print("\n"),
        ResetColor
    )?;

    execute!(
        out,
        SetForegroundColor(Color::Yellow),
        Print("TIME:\n"),
        ResetColor,
        Print(format!("  Raw UTC time:   {:06}\n", fix.time.raw_value())),
        Print(format!(
            "  UTC:            {:02}:{:02}:{:02}\n\n",
            fix.time.hours(),
            fix.time.minutes(),
            fix.time.seconds()
        ))
    )?;

    execute!(
        out,
        SetForegroundColor(Color::Cyan),
        Print("POSITION:\n"),
        ResetColor,
        Print(format!(
            "  Latitude:       {:>12.6} ({})\n",
            fix.latitude, fix.latitude_hemisphere
        )),
        Print(format!(
            "  Longitude:      {:>12.6} ({})\n",
            fix.longitude, fix.longitude_hemisphere
        )),
        Print(format!("  Altitude:       {:>12.1} m\n", fix.altitude_meters)),
        Print(format!("  Geoid:          {:>12.1} m\n\n", fix.geoid_separation_meters))
    )?;

    let dgps_age = match fix.dgps_age() {
        Some(age) => format!("{:.1} s", age),
        None => "n/a".to_string(),
    };
    let dgps_station = match fix.dgps_station_id {
        Some(id) => format!("{:04}", id),
        None => "n/a".to_string(),
    };

    execute!(
        out,
        SetForegroundColor(Color::Magenta),
        Print("QUALITY:\n"),
        ResetColor,
        Print(format!(
            "  Fix type:       {} ({})\n",
            fix.fix_quality.description(),
            fix.fix_quality.value()
        )),
        Print(format!("  Sats in view:   {}\n", fix.satellites_in_view)),
        Print(format!("  HDOP:           {:.1}\n", fix.horizontal_dilution)),
        Print(format!("  Last DGPS:      {}\n", dgps_age)),
        Print(format!("  DGPS station:   {}\n", dgps_station)),
        Print(format!("  Checksum:       {:02X}\n\n", fix.sentence_checksum))
    )?;

    let leg = &report.leg;
    execute!(
        out,
        SetForegroundColor(Color::Blue),
        Print("REFERENCE:\n"),
        ResetColor,
        Print(format!(
            "  Point:          {:.6}, {:.6}\n",
            leg.reference.latitude, leg.reference.longitude
        )),
        Print(format!("  Distance:       {:.3} km\n", leg.distance_km)),
        Print(format!("  Bearing:        {:.2} degrees\n", leg.compass_bearing))
    )?;

    out.flush()?;
    Ok(())
}
