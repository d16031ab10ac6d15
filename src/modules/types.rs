//! Measurement types.

use std::fmt;

use chrono::{DateTime, Local};

/// One sound level reading in tenths of a decibel.
///
/// The meter reports levels as a 2-byte little-endian magnitude with
/// 0.1 dB resolution. A magnitude of exactly zero is what the device
/// produces when polled before a fresh sample exists and is never a
/// real reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundLevel(u16);

impl SoundLevel {
    /// Create a level from a raw tenths-of-dB magnitude.
    pub fn from_tenths(tenths: u16) -> Self {
        Self(tenths)
    }

    /// Decode a level from a measurement response payload.
    ///
    /// Only an exactly 2-byte payload is a measurement; any other
    /// length is a protocol anomaly and yields `None`.
    pub fn from_wire(payload: &[u8]) -> Option<Self> {
        match payload {
            [lo, hi] => Some(Self(u16::from_le_bytes([*lo, *hi]))),
            _ => None,
        }
    }

    /// Raw magnitude in 0.1 dB steps.
    pub fn tenths(&self) -> u16 {
        self.0
    }

    /// Level in decibels.
    pub fn db(&self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Whether this is the transient zero reading.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SoundLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// One accepted sample: a level stamped with the wall clock at receipt.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub level: SoundLevel,
    pub timestamp: DateTime<Local>,
}

impl Measurement {
    pub fn new(level: SoundLevel, timestamp: DateTime<Local>) -> Self {
        Self { level, timestamp }
    }

    /// Stamp a level with the current local time.
    pub fn now(level: SoundLevel) -> Self {
        Self::new(level, Local::now())
    }
}

/// Identity of one enumerated bus device, for scan listings.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub info: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_magnitude() {
        assert_eq!(SoundLevel::from_wire(&[0x0a, 0x00]), Some(SoundLevel(10)));
        assert_eq!(SoundLevel::from_wire(&[0x00, 0x01]), Some(SoundLevel(256)));
        assert_eq!(SoundLevel::from_wire(&[0x32, 0x00]), Some(SoundLevel(50)));
    }

    #[test]
    fn rejects_anomalous_payload_lengths() {
        assert_eq!(SoundLevel::from_wire(&[]), None);
        assert_eq!(SoundLevel::from_wire(&[0xff]), None);
        assert_eq!(SoundLevel::from_wire(&[0x01, 0x02, 0x03]), None);
    }

    #[test]
    fn formats_with_one_fractional_digit() {
        assert_eq!(SoundLevel(256).to_string(), "25.6");
        assert_eq!(SoundLevel(50).to_string(), "5.0");
        assert_eq!(SoundLevel(7).to_string(), "0.7");
    }

    #[test]
    fn zero_magnitude_is_flagged() {
        assert!(SoundLevel(0).is_zero());
        assert!(!SoundLevel(1).is_zero());
    }
}
