// src/gps/nmea.rs
//! GPGGA sentence decoding

use super::checksum::{self, parse_hex_byte};
use super::data::{FixQuality, FixRecord, UtcTime, DGPS_AGE_UNAVAILABLE};
use crate::error::{GpsError, Result};

/// Number of comma-delimited fields in a GGA sentence, sentence ID included
pub const GGA_FIELD_COUNT: usize = 15;

/// Verify the checksum, then decode. A sentence failing the checksum is never decoded.
pub fn parse_gga(sentence: &str) -> Result<FixRecord> {
    checksum::verify(sentence)?;
    decode(sentence)
}

/// Decode a GPGGA sentence into a [`FixRecord`] by field position.
///
/// Field layout:
/// `$GPGGA,hhmmss.sss,ddmm.mmmm,N,dddmm.mmmm,W,q,ss,h.h,a.a,M,g.g,M,age,ssss*HH`
pub fn decode(sentence: &str) -> Result<FixRecord> {
    let sentence = sentence.trim_end_matches(['\r', '\n']);
    let parts: Vec<&str> = sentence.split(',').collect();

    if parts.len() < GGA_FIELD_COUNT {
        return Err(GpsError::malformed(
            parts.len(),
            format!(
                "expected {} fields, found {}",
                GGA_FIELD_COUNT,
                parts.len()
            ),
        ));
    }

    let time = parse_time(parts[1])?;

    // Latitude (field 2 and 3)
    let latitude_hemisphere = hemisphere(parts[3], 'S', 'N');
    let mut latitude = parse_coordinate(parts[2], 2, 2)?;
    if latitude > 90.0 {
        return Err(GpsError::malformed(2, format!("latitude out of range: {:?}", parts[2])));
    }
    if latitude_hemisphere == 'S' {
        latitude = -latitude;
    }

    // Longitude (field 4 and 5)
    let longitude_hemisphere = hemisphere(parts[5], 'W', 'E');
    let mut longitude = parse_coordinate(parts[4], 3, 4)?;
    if longitude > 180.0 {
        return Err(GpsError::malformed(4, format!("longitude out of range: {:?}", parts[4])));
    }
    if longitude_hemisphere == 'W' {
        longitude = -longitude;
    }

    let fix_quality = FixQuality::from(parse_field::<u8>(parts[6], 6)?);
    let satellites_in_view = parse_field::<u8>(parts[7], 7)?;

    let horizontal_dilution = parse_float(parts[8], 8)?;
    if horizontal_dilution < 0.0 {
        return Err(GpsError::malformed(8, format!("negative HDOP: {:?}", parts[8])));
    }

    let altitude_meters = parse_float(parts[9], 9)?;
    let geoid_separation_meters = parse_float(parts[11], 11)?;

    // An empty DGPS age means no DGPS correction is in use
    let last_dgps_update_seconds = if parts[13].is_empty() {
        DGPS_AGE_UNAVAILABLE
    } else {
        parse_float(parts[13], 13)?
    };

    let (dgps_station_id, sentence_checksum) = parse_station_and_checksum(parts[14])?;

    Ok(FixRecord {
        time,
        latitude,
        latitude_hemisphere,
        longitude,
        longitude_hemisphere,
        fix_quality,
        satellites_in_view,
        horizontal_dilution,
        altitude_meters,
        geoid_separation_meters,
        last_dgps_update_seconds,
        dgps_station_id,
        sentence_checksum,
    })
}

/// Field 1: `hhmmss` with an optional fraction, split by fixed width
fn parse_time(field: &str) -> Result<UtcTime> {
    let (whole, fraction) = field.split_once('.').unwrap_or((field, ""));
    if whole.len() != 6
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(GpsError::malformed(1, format!("invalid UTC time: {:?}", field)));
    }

    let hours: u32 = whole[0..2].parse().map_err(|_| GpsError::malformed(1, field))?;
    let minutes: u32 = whole[2..4].parse().map_err(|_| GpsError::malformed(1, field))?;
    let seconds: u32 = whole[4..6].parse().map_err(|_| GpsError::malformed(1, field))?;

    UtcTime::from_raw(hours * 10_000 + minutes * 100 + seconds)
        .ok_or_else(|| GpsError::malformed(1, format!("UTC time out of range: {:?}", field)))
}

/// `ddmm.mmmm` / `dddmm.mmmm`: whole degrees from a fixed-width prefix,
/// the remainder is minutes.
fn parse_coordinate(field: &str, degree_width: usize, index: usize) -> Result<f64> {
    if field.len() <= degree_width || !field.is_char_boundary(degree_width) {
        return Err(GpsError::malformed(index, format!("invalid coordinate: {:?}", field)));
    }
    let (degrees, minutes) = field.split_at(degree_width);
    if !degrees.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GpsError::malformed(index, format!("invalid coordinate: {:?}", field)));
    }

    let degrees: f64 = degrees
        .parse()
        .map_err(|_| GpsError::malformed(index, field))?;
    let minutes = parse_float(minutes, index)?;
    if !(0.0..60.0).contains(&minutes) {
        return Err(GpsError::malformed(index, format!("minutes out of range: {:?}", field)));
    }

    Ok(degrees + minutes / 60.0)
}

/// Non-strict: anything but the negative letter counts as the positive hemisphere
fn hemisphere(field: &str, negative: char, positive: char) -> char {
    if field.starts_with(negative) {
        negative
    } else {
        positive
    }
}

/// Field 14: four-digit DGPS station ID, then `*` and the two-digit checksum
fn parse_station_and_checksum(field: &str) -> Result<(Option<u16>, u8)> {
    let (station, hex) = field
        .split_once('*')
        .ok_or_else(|| GpsError::malformed(14, format!("missing checksum delimiter: {:?}", field)))?;

    let checksum = parse_hex_byte(hex.trim_end())
        .ok_or_else(|| GpsError::malformed(14, format!("invalid checksum: {:?}", field)))?;

    if station.is_empty() {
        return Ok((None, checksum));
    }

    if station.len() != 4 || !station.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GpsError::malformed(14, format!("invalid DGPS station ID: {:?}", field)));
    }
    let id: u16 = station
        .parse()
        .map_err(|_| GpsError::malformed(14, field))?;
    if id > 1023 {
        return Err(GpsError::malformed(14, format!("DGPS station ID out of range: {}", id)));
    }

    Ok((Some(id), checksum))
}

fn parse_field<T: std::str::FromStr>(field: &str, index: usize) -> Result<T> {
    field
        .parse::<T>()
        .map_err(|_| GpsError::malformed(index, format!("invalid number: {:?}", field)))
}

fn parse_float(field: &str, index: usize) -> Result<f64> {
    let value: f64 = parse_field(field, index)?;
    if !value.is_finite() {
        return Err(GpsError::malformed(index, format!("invalid number: {:?}", field)));
    }
    Ok(value)
}
