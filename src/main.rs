//! DL-161S acquisition daemon.
//!
//! Opens the meter, programs it for one live sample per second,
//! reports the stored calibration offset, then logs one reading per
//! second into one CSV file per day. Fatal transport errors exit the
//! process; restarting is the supervisor's job.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use rusb::Context;

use dl161s::modules::constants::SAMPLE_INTERVAL;
use dl161s::modules::usb;
use dl161s::{acquisition, calibration, DailyLogSink, DeviceSession, MeterError, SetupFrame, UsbTransport};

#[derive(Parser)]
#[command(name = "dl161s", about = "DL-161S sound level meter USB data logger")]
struct Cli {
    /// Directory receiving one CSV file per day
    #[arg(long, default_value = "/var/www/html/logs")]
    log_dir: PathBuf,

    /// Calibration delta to apply at startup, in 0.1 dB steps
    #[arg(
        short = 'c',
        long,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i8).range(-120..=120)
    )]
    calibrate: Option<i8>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    log::info!("started");
    let status = match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    };
    log::info!("ended");
    status
}

fn run(cli: &Cli) -> Result<(), MeterError> {
    let context = Context::new().map_err(MeterError::Enumeration)?;

    let stop = Arc::new(AtomicBool::new(false));
    #[cfg(feature = "ctrlc")]
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || {
            stop.store(true, std::sync::atomic::Ordering::SeqCst);
        }) {
            log::warn!("failed to install signal handler: {e}");
        }
    }

    // Full discovery-and-handshake sequence, used for the initial
    // connect and again whenever the loop asks for a fresh session.
    let mut connect = || -> Result<DeviceSession<UsbTransport>, MeterError> {
        let transport = UsbTransport::open(&context)?;
        let mut session = DeviceSession::new(transport);
        session.initialize(&SetupFrame::live_monitoring(Local::now()))?;
        Ok(session)
    };

    let mut session = match connect() {
        Ok(session) => session,
        Err(e @ MeterError::DeviceNotFound { .. }) => {
            for device in usb::scan_devices(&context) {
                log::debug!("present on bus: {}", device.info);
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    match calibration::read(&mut session) {
        Some(stored) => log::info!("stored calibration value: {stored}*0.1 dB"),
        None => log::warn!("could not read stored calibration value"),
    }
    if let Some(delta) = cli.calibrate {
        match calibration::adjust(&mut session, delta) {
            Some(stored) => log::info!("new stored calibration value: {stored}*0.1 dB"),
            None => log::warn!("calibration adjustment by {delta} failed"),
        }
    }

    let mut sink = DailyLogSink::new(&cli.log_dir);
    let result = acquisition::run(session, &mut connect, &mut sink, &stop, SAMPLE_INTERVAL);
    if let Err(e) = sink.flush() {
        log::error!("failed to flush log file: {e}");
    }
    result
}
