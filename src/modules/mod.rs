//! Module declarations for the meter daemon.

// Wire protocol constants
pub mod constants;

// Error types
pub mod error;

// Measurement types
pub mod types;

// Setup frame model
pub mod setup;

// Transport seam
pub mod transport;

// rusb transport
pub mod usb;

// Session lifecycle
pub mod session;

// Calibration sub-protocol
pub mod calibration;

// Acquisition loop
pub mod acquisition;

// Day-partitioned log
pub mod logsink;
