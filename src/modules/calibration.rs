//! Calibration offset read/adjust sub-protocol.
//!
//! The offset is a signed value in 0.1 dB steps stored on the device.
//! A delta is added to the stored value and the device replies with
//! the new accumulated value; a delta of 0 therefore reads the stored
//! value without altering it. Failures here are deliberately
//! non-fatal: a meter with an unreadable calibration can still sample.

use crate::modules::constants::{CALIBRATION_RANGE, CMD_CALIBRATION, RESPONSE_BUF_LEN};
use crate::modules::session::DeviceSession;
use crate::modules::transport::Transport;

/// Add `delta` to the stored calibration offset.
///
/// Returns the accumulated value the device now stores, or `None` on
/// any transport failure or malformed reply.
pub fn adjust<T: Transport>(session: &mut DeviceSession<T>, delta: i8) -> Option<i8> {
    log::debug!("adjust calibration by {delta}");
    if !session.is_ready() {
        log::warn!("calibration requested on a session that is not ready");
        return None;
    }
    if delta.unsigned_abs() > CALIBRATION_RANGE.unsigned_abs() {
        log::warn!("calibration delta {delta} out of range");
        return None;
    }

    if let Err(e) = session.send(&[CMD_CALIBRATION, delta as u8, 0x00]) {
        log::error!("calibration write failed: {e}");
        return None;
    }

    let mut buf = [0u8; RESPONSE_BUF_LEN];
    match session.receive(&mut buf) {
        Ok(1) => {
            let accumulated = buf[0] as i8;
            log::debug!("accumulated calibration value: {accumulated}");
            Some(accumulated)
        }
        Ok(received) => {
            log::error!(
                "unexpected calibration response ({received} bytes): {:02x?}",
                &buf[..received]
            );
            None
        }
        Err(e) => {
            log::error!("calibration read failed: {e}");
            None
        }
    }
}

/// Read the stored calibration offset without changing it.
pub fn read<T: Transport>(session: &mut DeviceSession<T>) -> Option<i8> {
    adjust(session, 0)
}
