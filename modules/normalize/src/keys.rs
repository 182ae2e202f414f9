//! Surrogate key derivation for locations and services.
//!
//! Keys are a pure function of the record's fields, which is what lets a
//! repeated scan of the same location or service land on the same row.

use crate::NormalizeError;
use scanload_core::{LocationId, Protocol, ServiceId};
use serde::{Deserialize, Deserializer};
use serde_json::Number;
use sha2::{Digest, Sha256};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyScheme {
    /// Digit concatenation, compatible with databases already populated by the
    /// original loader. Distinct inputs can collide.
    Legacy,
    /// Truncated SHA-256 of the canonical tuple.
    #[default]
    Hashed,
}

impl FromStr for KeyScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(KeyScheme::Legacy),
            "hashed" => Ok(KeyScheme::Hashed),
            other => Err(format!("unknown key scheme: {other}")),
        }
    }
}

/// Accepts the same spellings as `FromStr`, so config files and the
/// environment agree.
impl<'de> Deserialize<'de> for KeyScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub fn location_id(longitude: &Number, latitude: &Number, scheme: KeyScheme) -> Result<LocationId, NormalizeError> {
    match scheme {
        KeyScheme::Legacy => {
            let digits = format!("{}{}", longitude, latitude.to_string().replace('-', "")).replace('.', "");
            parse_digits("location_id", digits)
        }
        KeyScheme::Hashed => {
            // adding 0.0 folds -0.0 into 0.0, which the store treats as equal
            let lon = longitude.as_f64().unwrap_or_default() + 0.0;
            let lat = latitude.as_f64().unwrap_or_default() + 0.0;
            Ok(hash_key(&format!("{lon}|{lat}")))
        }
    }
}

pub fn service_id(ip: &str, port: u16, protocol: &Protocol, scheme: KeyScheme) -> Result<ServiceId, NormalizeError> {
    match scheme {
        KeyScheme::Legacy => {
            let mut digits = ip.replace('.', "");
            digits.push_str(&port.to_string());
            match protocol {
                Protocol::Tcp => digits.push('0'),
                Protocol::Udp => digits.push('1'),
                Protocol::Other(_) => {}
            }
            parse_digits("service_id", digits)
        }
        KeyScheme::Hashed => Ok(hash_key(&format!("{ip}|{port}|{protocol}"))),
    }
}

fn parse_digits(key: &'static str, digits: String) -> Result<i64, NormalizeError> {
    digits.parse::<i64>().map_err(|_| NormalizeError::KeyNotNumeric { key, digits })
}

/// First 8 digest bytes, big-endian, sign bit cleared so the key stays a
/// non-negative `bigint`.
fn hash_key(canonical: &str) -> i64 {
    let digest = Sha256::digest(canonical.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) & i64::MAX as u64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Number { Number::from_f64(v).unwrap() }

    #[test]
    fn legacy_location_concatenates_digits() {
        let id = location_id(&num(12.34), &num(-56.78), KeyScheme::Legacy).unwrap();
        assert_eq!(id, 12345678);
    }

    #[test]
    fn legacy_location_keeps_longitude_sign() {
        let id = location_id(&num(-122.41), &num(37.77), KeyScheme::Legacy).unwrap();
        assert_eq!(id, -122413777);
    }

    #[test]
    fn legacy_service_appends_protocol_flag() {
        assert_eq!(service_id("1.2.3.4", 443, &Protocol::Tcp, KeyScheme::Legacy).unwrap(), 12344430);
        assert_eq!(service_id("1.2.3.4", 53, &Protocol::Udp, KeyScheme::Legacy).unwrap(), 1234531);
        assert_eq!(service_id("1.2.3.4", 53, &Protocol::Other("sctp".into()), KeyScheme::Legacy).unwrap(), 123453);
    }

    #[test]
    fn legacy_rejects_non_numeric_ip() {
        let err = service_id("2001:db8::1", 80, &Protocol::Tcp, KeyScheme::Legacy).unwrap_err();
        assert!(matches!(err, NormalizeError::KeyNotNumeric { key: "service_id", .. }));
    }

    #[test]
    fn legacy_collides_where_hashed_does_not() {
        // 1.23/4.5 and 12.3/4.5 flatten to the same digits.
        let a = (num(1.23), num(4.5));
        let b = (num(12.3), num(4.5));
        assert_eq!(
            location_id(&a.0, &a.1, KeyScheme::Legacy).unwrap(),
            location_id(&b.0, &b.1, KeyScheme::Legacy).unwrap()
        );
        assert_ne!(
            location_id(&a.0, &a.1, KeyScheme::Hashed).unwrap(),
            location_id(&b.0, &b.1, KeyScheme::Hashed).unwrap()
        );

        // latitude sign is dropped by the legacy scheme only
        assert_ne!(
            location_id(&num(10.5), &num(-20.5), KeyScheme::Hashed).unwrap(),
            location_id(&num(10.5), &num(20.5), KeyScheme::Hashed).unwrap()
        );
    }

    #[test]
    fn hashed_location_ignores_sign_of_zero() {
        assert_eq!(
            location_id(&num(0.0), &num(10.5), KeyScheme::Hashed).unwrap(),
            location_id(&num(-0.0), &num(10.5), KeyScheme::Hashed).unwrap()
        );
        assert_eq!(
            location_id(&num(3.25), &num(0.0), KeyScheme::Hashed).unwrap(),
            location_id(&num(3.25), &num(-0.0), KeyScheme::Hashed).unwrap()
        );
    }

    #[test]
    fn hashed_keys_are_stable_and_non_negative() {
        let a = service_id("10.0.0.1", 22, &Protocol::Tcp, KeyScheme::Hashed).unwrap();
        let b = service_id("10.0.0.1", 22, &Protocol::Tcp, KeyScheme::Hashed).unwrap();
        let c = service_id("10.0.0.1", 22, &Protocol::Udp, KeyScheme::Hashed).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a >= 0 && c >= 0);
    }

    #[test]
    fn scheme_from_str() {
        assert_eq!("Legacy".parse::<KeyScheme>().unwrap(), KeyScheme::Legacy);
        assert_eq!("hashed".parse::<KeyScheme>().unwrap(), KeyScheme::Hashed);
        assert!("crc".parse::<KeyScheme>().is_err());
    }
}
