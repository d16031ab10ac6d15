//! Day-partitioned measurement log.
//!
//! One append-only file per local calendar day, named by the ISO
//! date. Each record is padded to 32 bytes so a buffered writer's
//! 4096-byte blocks always hold an integral number of lines.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::modules::types::Measurement;

struct OpenLog {
    date: NaiveDate,
    writer: BufWriter<File>,
}

/// Appends one formatted record per accepted measurement, rotating
/// the file when the local day changes.
pub struct DailyLogSink {
    dir: PathBuf,
    current: Option<OpenLog>,
}

impl DailyLogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    /// Log file path for a given day.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    /// Append one record, rotating first if the measurement belongs to
    /// a newer day than the open file.
    ///
    /// Rotation is forward-only: a measurement stamped before the open
    /// file's day (a stepped clock) is written to the current file
    /// rather than reopening the previous day's.
    pub fn append(&mut self, measurement: &Measurement) -> io::Result<()> {
        let date = measurement.timestamp.date_naive();
        let rotate = match &self.current {
            Some(open) => date > open.date,
            None => true,
        };
        if rotate {
            self.open_for(date)?;
        }

        let line = record_line(measurement);
        if let Some(open) = &mut self.current {
            let written = open.writer.write(line.as_bytes())?;
            if written != line.len() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {written} of {} bytes", line.len()),
                ));
            }
        }
        Ok(())
    }

    /// Flush the open file, if any.
    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.current {
            Some(open) => open.writer.flush(),
            None => Ok(()),
        }
    }

    fn open_for(&mut self, date: NaiveDate) -> io::Result<()> {
        if let Some(mut old) = self.current.take() {
            // Flush and close the previous day before touching the new one.
            if let Err(e) = old.writer.flush() {
                log::error!("failed to flush previous log file: {e}");
            }
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(date);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::info!("logging to {}", path.display());
        self.current = Some(OpenLog {
            date,
            writer: BufWriter::new(file),
        });
        Ok(())
    }
}

impl Drop for DailyLogSink {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("failed to flush log file: {e}");
        }
    }
}

/// Format one 32-byte record: timestamp, semicolon, padded level.
fn record_line(measurement: &Measurement) -> String {
    format!(
        "{};      {:>3}.{}\n",
        measurement.timestamp.format("%Y-%m-%d %H:%M:%S"),
        measurement.level.tenths() / 10,
        measurement.level.tenths() % 10,
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::modules::types::SoundLevel;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, tenths: u16) -> Measurement {
        Measurement::new(
            SoundLevel::from_tenths(tenths),
            Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
        )
    }

    #[test]
    fn records_are_exactly_32_bytes() {
        let line = record_line(&at(2024, 5, 1, 12, 0, 0, 1006));
        assert_eq!(line, "2024-05-01 12:00:00;      100.6\n");
        assert_eq!(line.len(), 32);

        let line = record_line(&at(2024, 5, 1, 12, 0, 0, 506));
        assert_eq!(line, "2024-05-01 12:00:00;       50.6\n");
        assert_eq!(line.len(), 32);
    }

    #[test]
    fn rotates_on_the_day_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DailyLogSink::new(dir.path());

        sink.append(&at(2024, 5, 1, 23, 59, 59, 431)).unwrap();
        sink.append(&at(2024, 5, 2, 0, 0, 1, 432)).unwrap();
        sink.flush().unwrap();

        let day1 = fs::read_to_string(dir.path().join("2024-05-01.csv")).unwrap();
        let day2 = fs::read_to_string(dir.path().join("2024-05-02.csv")).unwrap();
        assert_eq!(day1, "2024-05-01 23:59:59;      43.1\n");
        assert_eq!(day2, "2024-05-02 00:00:01;      43.2\n");
    }

    #[test]
    fn never_reopens_a_previous_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DailyLogSink::new(dir.path());

        sink.append(&at(2024, 5, 1, 23, 59, 59, 100)).unwrap();
        sink.append(&at(2024, 5, 2, 0, 0, 1, 200)).unwrap();
        // A stepped clock hands us a day-1 timestamp after rotation.
        sink.append(&at(2024, 5, 1, 23, 59, 58, 300)).unwrap();
        sink.flush().unwrap();

        let day1 = fs::read_to_string(dir.path().join("2024-05-01.csv")).unwrap();
        let day2 = fs::read_to_string(dir.path().join("2024-05-02.csv")).unwrap();
        assert_eq!(day1.lines().count(), 1);
        assert_eq!(day2.lines().count(), 2);
        assert!(day2.contains("30.0"));
    }

    #[test]
    fn appends_within_a_day_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DailyLogSink::new(dir.path());
        for second in 0..5 {
            sink.append(&at(2024, 5, 1, 10, 0, second, 50)).unwrap();
        }
        sink.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("2024-05-01.csv")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.ends_with("5.0")));
        assert!(lines.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn creates_the_base_directory_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");
        let mut sink = DailyLogSink::new(&nested);
        sink.append(&at(2024, 5, 1, 0, 0, 0, 10)).unwrap();
        sink.flush().unwrap();
        assert!(nested.join("2024-05-01.csv").exists());
    }
}
