//! File-backed store
//!
//! Appends are serialised through a mutex and each row goes to disk in a
//! single `write_all`, so concurrent writers never interleave partial rows.
//! Reads take no lock and scan the whole file.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use crate::reading::{parse_timestamp, Reading};
use crate::{LogError, Result};

/// Append-only reading log backed by one CSV file.
#[derive(Debug)]
pub struct ReadingLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ReadingLog {
    /// Bind a log to `path`. The file is created on the first append.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one reading to the end of the log.
    pub fn append(&self, reading: &Reading) -> Result<()> {
        if parse_timestamp(&reading.timestamp).is_none() {
            return Err(LogError::InvalidTimestamp(reading.timestamp.clone()));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let record = encode_record(reading, needs_header)?;
        file.write_all(&record)?;

        tracing::trace!(
            path = %self.path.display(),
            city = %reading.city,
            header = needs_header,
            "appended reading"
        );
        Ok(())
    }

    /// Readings from the last `window_hours`, in storage order.
    pub fn query(&self, city: Option<&str>, window_hours: i64) -> Result<Vec<Reading>> {
        self.query_at(Utc::now(), city, window_hours)
    }

    /// Like [`ReadingLog::query`] with an explicit clock.
    pub fn query_at(
        &self,
        now: DateTime<Utc>,
        city: Option<&str>,
        window_hours: i64,
    ) -> Result<Vec<Reading>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let cutoff = cutoff(now, window_hours);
        let wanted = city.map(str::to_lowercase);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let mut results = Vec::new();
        for row in reader.deserialize::<Reading>() {
            let reading = match row {
                Ok(reading) => reading,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!("skipping undecodable row in {}: {}", self.path.display(), e);
                    continue;
                }
            };

            let Some(ts) = reading.parsed_timestamp() else {
                continue;
            };
            if ts < cutoff {
                continue;
            }
            if let Some(ref wanted) = wanted {
                if reading.city.to_lowercase() != *wanted {
                    continue;
                }
            }
            results.push(reading);
        }

        Ok(results)
    }
}

fn encode_record(reading: &Reading, with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    writer.serialize(reading)?;
    writer
        .into_inner()
        .map_err(|e| LogError::Io(e.into_error()))
}

fn cutoff(now: DateTime<Utc>, window_hours: i64) -> DateTime<Utc> {
    match TimeDelta::try_hours(window_hours).and_then(|w| now.checked_sub_signed(w)) {
        Some(cutoff) => cutoff,
        None if window_hours < 0 => DateTime::<Utc>::MAX_UTC,
        None => DateTime::<Utc>::MIN_UTC,
    }
}
