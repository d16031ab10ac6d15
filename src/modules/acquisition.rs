//! Steady-state acquisition: poll, parse, log, self-heal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::modules::constants::{MEASUREMENT_REQUEST, RESPONSE_BUF_LEN};
use crate::modules::error::MeterError;
use crate::modules::logsink::DailyLogSink;
use crate::modules::session::DeviceSession;
use crate::modules::transport::Transport;
use crate::modules::types::{Measurement, SoundLevel};

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    /// A measurement was decoded and handed to the sink.
    Logged,
    /// The response length was anomalous; the cycle was discarded.
    Skipped,
    /// The meter reported 0.0; the session must be rebuilt.
    ZeroReading,
}

/// Poll the meter once per interval until `stop` is raised or a fatal
/// transport error occurs.
///
/// A zero-valued reading is the one self-healing path: the session is
/// fully closed and `connect` is asked for a fresh, initialized
/// replacement. Every bulk-transfer failure in the cycle itself is
/// fatal and propagates; restart is the supervisor's job.
pub fn run<T, F>(
    mut session: DeviceSession<T>,
    mut connect: F,
    sink: &mut DailyLogSink,
    stop: &AtomicBool,
    interval: Duration,
) -> Result<(), MeterError>
where
    T: Transport,
    F: FnMut() -> Result<DeviceSession<T>, MeterError>,
{
    while !stop.load(Ordering::SeqCst) {
        thread::sleep(interval);
        match cycle(&mut session, sink)? {
            CycleOutcome::Logged | CycleOutcome::Skipped => {}
            CycleOutcome::ZeroReading => {
                // Seen when the meter is polled faster than it samples;
                // the reading is spurious and the link needs a restart.
                log::warn!("measurement read back 0.0, reopening the device");
                session.close();
                session = connect()?;
            }
        }
    }
    session.close();
    Ok(())
}

fn cycle<T: Transport>(
    session: &mut DeviceSession<T>,
    sink: &mut DailyLogSink,
) -> Result<CycleOutcome, MeterError> {
    session.send(&MEASUREMENT_REQUEST)?;

    let mut buf = [0u8; RESPONSE_BUF_LEN];
    let received = session.receive(&mut buf)?;

    let level = match SoundLevel::from_wire(&buf[..received]) {
        Some(level) => level,
        None => {
            log::warn!(
                "unexpected measurement response ({received} bytes): {:02x?}",
                &buf[..received]
            );
            return Ok(CycleOutcome::Skipped);
        }
    };

    if level.is_zero() {
        return Ok(CycleOutcome::ZeroReading);
    }

    let measurement = Measurement::now(level);
    log::debug!("{} dB at {}", level, measurement.timestamp);
    if let Err(e) = sink.append(&measurement) {
        // Sampling outlives a broken log target.
        log::error!("failed to log measurement: {e}");
    }
    Ok(CycleOutcome::Logged)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::AtomicBool;

    use chrono::TimeZone;

    use super::*;
    use crate::modules::setup::SetupFrame;
    use crate::modules::transport::mock::MockTransport;

    fn test_setup() -> SetupFrame {
        let seeded = chrono::Local.with_ymd_and_hms(2016, 11, 6, 16, 8, 11).unwrap();
        SetupFrame::live_monitoring(seeded)
    }

    fn ready_session(transport: MockTransport) -> DeviceSession<MockTransport> {
        let mut transport = transport;
        transport.push_ack_front();
        let mut session = DeviceSession::new(transport).with_settle(Duration::ZERO);
        session.initialize(&test_setup()).unwrap();
        session
    }

    fn sink_in(dir: &tempfile::TempDir) -> DailyLogSink {
        DailyLogSink::new(dir.path())
    }

    #[test]
    fn cycle_requests_and_logs_one_measurement() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.push_read(&[0x32, 0x00]);
        let mut session = ready_session(transport);
        let mut sink = sink_in(&dir);

        let outcome = cycle(&mut session, &mut sink).unwrap();
        assert_eq!(outcome, CycleOutcome::Logged);
        assert_eq!(
            session.transport().writes.last().unwrap(),
            &MEASUREMENT_REQUEST.to_vec()
        );

        sink.flush().unwrap();
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn anomalous_response_length_skips_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.push_read(&[0x32, 0x00, 0x01]);
        let mut session = ready_session(transport);
        let mut sink = sink_in(&dir);

        assert_eq!(cycle(&mut session, &mut sink).unwrap(), CycleOutcome::Skipped);
        sink.flush().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn zero_reading_never_reaches_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.push_read(&[0x00, 0x00]);
        let mut session = ready_session(transport);
        let mut sink = sink_in(&dir);

        assert_eq!(
            cycle(&mut session, &mut sink).unwrap(),
            CycleOutcome::ZeroReading
        );
        sink.flush().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn request_write_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ready_session(MockTransport::new());
        session.transport_mut().fail_write = true;
        let mut sink = sink_in(&dir);

        let err = cycle(&mut session, &mut sink).unwrap_err();
        assert!(matches!(err, MeterError::WriteFailed(_)));
    }

    #[test]
    fn response_read_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Empty read queue: the request goes out, the read times out.
        let mut session = ready_session(MockTransport::new());
        let mut sink = sink_in(&dir);

        let err = cycle(&mut session, &mut sink).unwrap_err();
        assert!(matches!(err, MeterError::ReadFailed(_)));
    }

    #[test]
    fn zero_reading_restarts_the_full_handshake() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink_in(&dir);
        let stop = AtomicBool::new(false);

        // First session: one zero reading.
        let mut first = MockTransport::new();
        first.push_read(&[0x00, 0x00]);
        let first = ready_session(first);

        // Replacement session: one good reading, then a read failure
        // that terminates the loop.
        let mut reconnects = 0;
        let connect = || {
            reconnects += 1;
            let mut transport = MockTransport::new();
            transport.push_ack();
            transport.push_read(&[0x32, 0x00]);
            let mut session = DeviceSession::new(transport).with_settle(Duration::ZERO);
            session.initialize(&test_setup())?;
            Ok(session)
        };

        let err = run(first, connect, &mut sink, &stop, Duration::ZERO).unwrap_err();
        assert!(matches!(err, MeterError::ReadFailed(_)));
        assert_eq!(reconnects, 1);

        sink.flush().unwrap();
        let file = fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap();
        let content = fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("5.0"));
    }

    #[test]
    fn five_good_cycles_produce_five_ordered_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink_in(&dir);
        let stop = AtomicBool::new(false);

        let mut transport = MockTransport::new();
        transport.push_ack();
        for _ in 0..5 {
            transport.push_read(&[0x32, 0x00]);
        }
        let mut session = DeviceSession::new(transport).with_settle(Duration::ZERO);
        session.initialize(&test_setup()).unwrap();

        let connect = || panic!("no reconnect expected");
        let err = run(session, connect, &mut sink, &stop, Duration::ZERO).unwrap_err();
        assert!(matches!(err, MeterError::ReadFailed(_)));

        sink.flush().unwrap();
        let mut files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(files.pop().unwrap()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.ends_with("5.0")));
        let stamps: Vec<_> = lines.iter().map(|l| &l[..19]).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn stop_flag_ends_the_loop_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = sink_in(&dir);
        let stop = AtomicBool::new(true);

        let session = ready_session(MockTransport::new());
        let connect = || panic!("no reconnect expected");
        run(session, connect, &mut sink, &stop, Duration::ZERO).unwrap();
    }
}
