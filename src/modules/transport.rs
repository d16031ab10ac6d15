//! Transport abstraction over the meter's USB primitives.
//!
//! Everything the session and the acquisition loop need from the bus
//! goes through this trait, with an explicit timeout on every
//! transfer. The production implementation is [`crate::modules::usb::UsbTransport`].

use std::time::Duration;

use crate::modules::error::MeterError;

/// One claimed device with a bulk OUT/IN endpoint pair.
pub trait Transport {
    /// Issue a bus reset.
    fn reset(&mut self) -> Result<(), MeterError>;

    /// Select a configuration by bConfigurationValue.
    fn set_configuration(&mut self, config: u8) -> Result<(), MeterError>;

    /// Claim an interface by bInterfaceNumber.
    fn claim_interface(&mut self, interface: u8) -> Result<(), MeterError>;

    /// Issue a payload-less control transfer.
    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        timeout: Duration,
    ) -> Result<(), MeterError>;

    /// Write `data` to the OUT endpoint, returning the byte count accepted.
    fn bulk_write(&mut self, data: &[u8], timeout: Duration) -> Result<usize, MeterError>;

    /// Read from the IN endpoint into `buf`, returning the byte count received.
    fn bulk_read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, MeterError>;
}
