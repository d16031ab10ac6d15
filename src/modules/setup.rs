//! The 64-byte setup frame programming device behavior.
//!
//! The frame is sent once per session, verbatim and never partially.
//! Offsets 0..14 carry the documented fields; the remainder is an
//! opaque trailer the device expects byte-for-byte.

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::modules::constants::SETUP_FRAME_LEN;

/// Measurement trigger (mode bit 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Auto,
    Manual,
}

/// Where samples go (mode bit 6): streamed live or stored on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Realtime,
    Store,
}

/// Level detector (mode bit 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    Normal,
    Peak,
}

/// Frequency weighting curve (mode bit 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    DbC,
    DbA,
}

/// Time weighting (mode bit 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Slow,
    Fast,
}

/// Unit of the sample rate magnitude (mode bits 1-0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    None,
    Seconds,
    Minutes,
    Hours,
}

impl RateUnit {
    fn bits(self) -> u8 {
        match self {
            RateUnit::None => 0,
            RateUnit::Seconds => 1,
            RateUnit::Minutes => 2,
            RateUnit::Hours => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => RateUnit::Seconds,
            2 => RateUnit::Minutes,
            3 => RateUnit::Hours,
            _ => RateUnit::None,
        }
    }
}

/// The mode bitmask at offset 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFlags {
    pub trigger: Trigger,
    pub storage: StorageMode,
    /// Bit 5, undocumented; kept verbatim.
    pub check: bool,
    pub detector: Detector,
    pub weighting: Weighting,
    pub response: Response,
    pub rate_unit: RateUnit,
}

impl ModeFlags {
    pub fn encode(&self) -> u8 {
        let mut bits = self.rate_unit.bits();
        if self.trigger == Trigger::Manual {
            bits |= 1 << 7;
        }
        if self.storage == StorageMode::Store {
            bits |= 1 << 6;
        }
        if self.check {
            bits |= 1 << 5;
        }
        if self.detector == Detector::Peak {
            bits |= 1 << 4;
        }
        if self.weighting == Weighting::DbA {
            bits |= 1 << 3;
        }
        if self.response == Response::Fast {
            bits |= 1 << 2;
        }
        bits
    }

    pub fn decode(bits: u8) -> Self {
        Self {
            trigger: if bits & (1 << 7) != 0 {
                Trigger::Manual
            } else {
                Trigger::Auto
            },
            storage: if bits & (1 << 6) != 0 {
                StorageMode::Store
            } else {
                StorageMode::Realtime
            },
            check: bits & (1 << 5) != 0,
            detector: if bits & (1 << 4) != 0 {
                Detector::Peak
            } else {
                Detector::Normal
            },
            weighting: if bits & (1 << 3) != 0 {
                Weighting::DbA
            } else {
                Weighting::DbC
            },
            response: if bits & (1 << 2) != 0 {
                Response::Fast
            } else {
                Response::Slow
            },
            rate_unit: RateUnit::from_bits(bits),
        }
    }
}

/// Seed for the device's real-time clock, offsets 5..11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSeed {
    /// Two-digit year.
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl From<DateTime<Local>> for ClockSeed {
    fn from(t: DateTime<Local>) -> Self {
        Self {
            year: (t.year() % 100) as u8,
            month: t.month() as u8,
            day: t.day() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second() as u8,
        }
    }
}

/// Reserved tail of the frame, offsets 14..64. Opaque to the host;
/// the device rejects frames that alter it.
const TRAILER: [u8; SETUP_FRAME_LEN - 14] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x8c, 0x39, 0xbb, 0x78, 0x03,
    0x00, 0x00, 0x00, 0x0e, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Typed view of the configuration block sent once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupFrame {
    /// Green LED blink interval in seconds.
    pub led_interval: u8,
    pub mode: ModeFlags,
    /// Sample rate magnitude, in `mode.rate_unit` units.
    pub sample_rate: u8,
    /// Alarm LED high threshold, dB.
    pub alarm_high: u8,
    /// Alarm LED low threshold, dB.
    pub alarm_low: u8,
    pub clock: ClockSeed,
    /// Sample count limit, 24 bits.
    pub sample_limit: u32,
}

impl SetupFrame {
    /// Frame requesting one live dBA peak sample per second, with the
    /// device clock seeded from `now`.
    pub fn live_monitoring(now: DateTime<Local>) -> Self {
        Self {
            led_interval: 10,
            mode: ModeFlags {
                trigger: Trigger::Auto,
                storage: StorageMode::Store,
                check: false,
                detector: Detector::Peak,
                weighting: Weighting::DbA,
                response: Response::Slow,
                rate_unit: RateUnit::Seconds,
            },
            sample_rate: 1,
            alarm_high: 60,
            alarm_low: 30,
            clock: now.into(),
            sample_limit: 0x01fb80,
        }
    }

    /// Serialize to the exact 64 bytes put on the wire.
    pub fn encode(&self) -> [u8; SETUP_FRAME_LEN] {
        let mut frame = [0u8; SETUP_FRAME_LEN];
        frame[0] = self.led_interval;
        frame[1] = self.mode.encode();
        frame[2] = self.sample_rate;
        frame[3] = self.alarm_high;
        frame[4] = self.alarm_low;
        frame[5] = self.clock.year;
        frame[6] = self.clock.month;
        frame[7] = self.clock.day;
        frame[8] = self.clock.hour;
        frame[9] = self.clock.minute;
        frame[10] = self.clock.second;
        frame[11] = (self.sample_limit >> 16) as u8;
        frame[12] = (self.sample_limit >> 8) as u8;
        frame[13] = self.sample_limit as u8;
        frame[14..].copy_from_slice(&TRAILER);
        frame
    }

    /// Rebuild the typed view from an encoded frame. The trailer is
    /// fixed and not represented, so `decode(encode(f)) == f`.
    pub fn decode(frame: &[u8; SETUP_FRAME_LEN]) -> Self {
        Self {
            led_interval: frame[0],
            mode: ModeFlags::decode(frame[1]),
            sample_rate: frame[2],
            alarm_high: frame[3],
            alarm_low: frame[4],
            clock: ClockSeed {
                year: frame[5],
                month: frame[6],
                day: frame[7],
                hour: frame[8],
                minute: frame[9],
                second: frame[10],
            },
            sample_limit: u32::from(frame[11]) << 16
                | u32::from(frame[12]) << 8
                | u32::from(frame[13]),
        }
    }
}
