// src/gps/geodesy.rs
//! Great-circle distance and bearing on a spherical Earth

use super::data::GeoPoint;

/// WGS-84 equatorial radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// Haversine distance between two points, in kilometres
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_long = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (lat_a.cos() * lat_b.cos()) * (d_long / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from `a` to `b`, in degrees.
///
/// This is `atan2` in degrees plus 360 with no modulo applied, so the result lies
/// in `180.0..=540.0`. Use [`compass_bearing`] for the `0.0..360.0` convention.
pub fn bearing_degrees(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_long = (b.longitude - a.longitude).to_radians();

    let y = d_long.sin() * lat_b.cos();
    let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * d_long.cos();

    y.atan2(x).to_degrees() + 360.0
}

/// Initial bearing normalized to `0.0..360.0`
pub fn compass_bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    normalize_bearing(bearing_degrees(a, b))
}

pub fn normalize_bearing(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
