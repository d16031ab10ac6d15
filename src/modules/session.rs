//! Session lifecycle: discovery hand-off, handshake, steady-state I/O.

use std::thread;
use std::time::Duration;

use crate::modules::constants::{
    CONFIGURATION_VALUE, INTERFACE_NUMBER, RESPONSE_BUF_LEN, SETTLE_DELAY, SETUP_ACK,
    SETUP_ANNOUNCE, TRANSFER_TIMEOUT, VENDOR_REQUEST, VENDOR_REQUEST_TYPE, VENDOR_REQUEST_VALUE,
};
use crate::modules::error::MeterError;
use crate::modules::setup::SetupFrame;
use crate::modules::transport::Transport;

/// Lifecycle of one exclusive device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Handshaking,
    Ready,
    Closed,
}

/// One exclusive claim on the meter.
///
/// At most one session is live at a time; the reconnect path closes
/// the old session before a new one is opened.
pub struct DeviceSession<T: Transport> {
    transport: T,
    state: SessionState,
    settle: Duration,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Uninitialized,
            settle: SETTLE_DELAY,
        }
    }

    /// Override the post-handshake settle pause.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Run the full initialization handshake.
    ///
    /// Reset, configuration select and interface claim are fatal on
    /// failure. The vendor control request is known to be rejected by
    /// some units and is only logged. The setup acknowledgement is
    /// expected to be a single 0xFF byte; any other response is logged
    /// and the session proceeds anyway.
    pub fn initialize(&mut self, setup: &SetupFrame) -> Result<(), MeterError> {
        self.state = SessionState::Handshaking;
        match self.handshake(setup) {
            Ok(()) => {
                self.state = SessionState::Ready;
                log::info!("session ready");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn handshake(&mut self, setup: &SetupFrame) -> Result<(), MeterError> {
        self.transport.reset()?;
        self.transport.set_configuration(CONFIGURATION_VALUE)?;
        self.transport.claim_interface(INTERFACE_NUMBER)?;

        if let Err(e) = self.transport.control_transfer(
            VENDOR_REQUEST_TYPE,
            VENDOR_REQUEST,
            VENDOR_REQUEST_VALUE,
            0,
            TRANSFER_TIMEOUT,
        ) {
            // Known quirk: some units reject this request outright.
            log::warn!("vendor control request rejected, continuing: {e}");
        }

        self.send(&SETUP_ANNOUNCE)?;
        self.send(&setup.encode())?;

        let mut buf = [0u8; RESPONSE_BUF_LEN];
        let received = self.receive(&mut buf)?;
        if received == 1 && buf[0] == SETUP_ACK {
            log::debug!("setup acknowledged");
        } else {
            log::warn!(
                "unexpected setup response ({received} bytes): {:02x?}",
                &buf[..received]
            );
        }

        thread::sleep(self.settle);
        Ok(())
    }

    /// Write one command frame to the OUT endpoint, whole or not at all.
    pub fn send(&mut self, data: &[u8]) -> Result<(), MeterError> {
        self.check_open()?;
        let written = self.transport.bulk_write(data, TRANSFER_TIMEOUT)?;
        if written != data.len() {
            return Err(MeterError::ShortWrite {
                written,
                requested: data.len(),
            });
        }
        log::trace!("sent {written} bytes");
        Ok(())
    }

    /// Read one response from the IN endpoint, returning its length.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, MeterError> {
        self.check_open()?;
        let received = self.transport.bulk_read(buf, TRANSFER_TIMEOUT)?;
        log::trace!("received {received} bytes");
        Ok(received)
    }

    /// Drop the exclusive claim. The underlying handle closes with the
    /// transport.
    pub fn close(self) {
        log::info!("session closed");
    }

    fn check_open(&self) -> Result<(), MeterError> {
        match self.state {
            SessionState::Handshaking | SessionState::Ready => Ok(()),
            SessionState::Uninitialized | SessionState::Closed => Err(MeterError::NotOpen),
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
