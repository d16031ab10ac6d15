//! Error types for meter communication.

use thiserror::Error;

/// Errors raised while talking to the meter.
///
/// Every variant that wraps a `rusb::Error` names the operation that
/// failed, so a single log line is enough to place a fault.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("device {vid:04x}:{pid:04x} not found")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("usb enumeration failed: {0}")]
    Enumeration(#[source] rusb::Error),

    #[error("failed to read configuration descriptor: {0}")]
    Descriptor(#[source] rusb::Error),

    #[error("interface 0 does not expose a bulk endpoint pair")]
    EndpointsMissing,

    #[error("failed to open device: {0}")]
    OpenFailed(#[source] rusb::Error),

    #[error("bus reset failed: {0}")]
    ResetFailed(#[source] rusb::Error),

    #[error("set_configuration failed: {0}")]
    ConfigFailed(#[source] rusb::Error),

    #[error("claim_interface failed: {0}")]
    ClaimFailed(#[source] rusb::Error),

    #[error("control transfer failed: {0}")]
    ControlFailed(#[source] rusb::Error),

    #[error("bulk write failed: {0}")]
    WriteFailed(#[source] rusb::Error),

    #[error("bulk write incomplete: {written} of {requested} bytes")]
    ShortWrite { written: usize, requested: usize },

    #[error("bulk read failed: {0}")]
    ReadFailed(#[source] rusb::Error),

    #[error("session is not open")]
    NotOpen,
}
