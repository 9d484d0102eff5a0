// src/gps/checksum.rs
//! NMEA XOR checksum

use crate::error::{GpsError, Result};

/// XOR of every byte in `body`
pub fn calculate(body: &str) -> u8 {
    body.bytes().fold(0, |sum, b| sum ^ b)
}

/// Verify the trailing `*HH` checksum of a received sentence.
///
/// The checksummed region is everything strictly between the leading `$` and the
/// last `*`. On success returns the checksum value.
pub fn verify(sentence: &str) -> Result<u8> {
    let sentence = sentence.trim_end_matches(['\r', '\n']);
    let body = sentence.strip_prefix('$').unwrap_or(sentence);

    let Some((region, hex)) = body.rsplit_once('*') else {
        return Err(GpsError::ChecksumMismatch {
            expected: None,
            computed: calculate(body),
        });
    };

    let computed = calculate(region);
    if !sentence.starts_with('$') {
        return Err(GpsError::ChecksumMismatch {
            expected: None,
            computed,
        });
    }

    let expected = parse_hex_byte(hex).ok_or(GpsError::ChecksumMismatch {
        expected: None,
        computed,
    })?;

    if expected != computed {
        return Err(GpsError::ChecksumMismatch {
            expected: Some(expected),
            computed,
        });
    }

    Ok(computed)
}

/// Append `*HH\r\n` to an outgoing sentence such as `$PSRF100,1,4800,8,1,0`.
pub fn with_checksum(sentence: &str) -> String {
    let body = sentence.strip_prefix('$').unwrap_or(sentence);
    format!("${}*{:02X}\r\n", body, calculate(body))
}

/// Two hex digits, nothing else
pub(crate) fn parse_hex_byte(hex: &str) -> Option<u8> {
    if hex.len() != 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}
