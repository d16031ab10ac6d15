//! Wire protocol constants for the DL-161S.

use std::time::Duration;

/// USB vendor ID (Cygnal Integrated Products CP210x bridge).
pub const USB_VID: u16 = 0x10c4;

/// USB product ID.
pub const USB_PID: u16 = 0xea61;

/// Per-transfer timeout applied to every control and bulk call.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(5000);

/// wMaxPacketSize of the bulk endpoints; every IN read requests this much.
pub const RESPONSE_BUF_LEN: usize = 64;

/// bConfigurationValue selected during the handshake.
pub const CONFIGURATION_VALUE: u8 = 1;

/// bInterfaceNumber claimed during the handshake.
pub const INTERFACE_NUMBER: u8 = 0;

/// bmRequestType of the vendor control request issued after the claim.
pub const VENDOR_REQUEST_TYPE: u8 = 0x40;

/// bRequest of the vendor control request.
pub const VENDOR_REQUEST: u8 = 2;

/// wValue of the vendor control request.
pub const VENDOR_REQUEST_VALUE: u16 = 0x0002;

/// Command opcode announcing that a setup frame follows.
pub const CMD_SETUP: u8 = 0x0e;

/// Command opcode adjusting (or, with delta 0, reading) the calibration offset.
pub const CMD_CALIBRATION: u8 = 0x0c;

/// Command opcode requesting one live measurement.
pub const CMD_MEASUREMENT: u8 = 0xff;

/// Length of the setup frame in bytes.
pub const SETUP_FRAME_LEN: usize = 64;

/// Announce frame sent before the setup frame; the second byte is the
/// length of the frame that follows.
pub const SETUP_ANNOUNCE: [u8; 3] = [CMD_SETUP, SETUP_FRAME_LEN as u8, 0x00];

/// Single byte the device answers a setup frame with.
pub const SETUP_ACK: u8 = 0xff;

/// Request frame polled once per acquisition cycle.
pub const MEASUREMENT_REQUEST: [u8; 3] = [CMD_MEASUREMENT, 0x00, 0x00];

/// Pause after the handshake while the device applies the new configuration.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Inter-sample delay, slightly over the device's own 1 Hz cadence so the
/// loop never polls faster than the meter produces fresh data.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(1100);

/// Largest calibration delta accepted, in 0.1 dB steps (manual: +/- 12.0 dB).
pub const CALIBRATION_RANGE: i8 = 120;
