//! USB acquisition library for the Voltcraft DL-161S sound level meter.
//!
//! The meter speaks a small command protocol over one bulk OUT/IN
//! endpoint pair behind a CP210x bridge: a 64-byte setup frame
//! programs it, `0xFF` polls one live sample per second, `0x0C`
//! adjusts the stored calibration offset. This crate drives that
//! protocol and appends each sample to a day-partitioned CSV log.
//!
//! The usual flow:
//!
//! ```no_run
//! use chrono::Local;
//! use dl161s::{calibration, DeviceSession, SetupFrame, UsbTransport};
//!
//! # fn main() -> Result<(), dl161s::MeterError> {
//! let context = rusb::Context::new().map_err(dl161s::MeterError::Enumeration)?;
//! let transport = UsbTransport::open(&context)?;
//! let mut session = DeviceSession::new(transport);
//! session.initialize(&SetupFrame::live_monitoring(Local::now()))?;
//!
//! if let Some(stored) = calibration::read(&mut session) {
//!     println!("stored calibration: {stored} * 0.1 dB");
//! }
//! # Ok(())
//! # }
//! ```

pub mod modules;

pub use modules::acquisition;
pub use modules::calibration;
pub use modules::error::MeterError;
pub use modules::logsink::DailyLogSink;
pub use modules::session::{DeviceSession, SessionState};
pub use modules::setup::SetupFrame;
pub use modules::transport::Transport;
pub use modules::types::{DeviceInfo, Measurement, SoundLevel};
pub use modules::usb::UsbTransport;
