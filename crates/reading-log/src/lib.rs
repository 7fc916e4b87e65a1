//! Reading Log
//!
//! Append-only CSV store for air quality readings. The gateway's collector
//! and its `/current` handler append one row per successful upstream fetch;
//! the history endpoints read the file back with a time window and an
//! optional city filter.
//!
//! # File layout
//!
//! ```text
//! timestamp,city,state,country,pm25,temperature,humidity,aqi
//! 2025-06-01T12:00:00.000Z,Curitiba,Parana,Brazil,42,18,77,42
//! ```
//!
//! The header is written exactly once, when the file is created. Rows are
//! never rewritten or reordered. Missing values are empty fields.

use thiserror::Error;

pub mod reading;
pub mod store;

pub use reading::{parse_timestamp, Reading};
pub use store::ReadingLog;

/// Column order of the log file.
pub const HEADER: [&str; 8] = [
    "timestamp",
    "city",
    "state",
    "country",
    "pm25",
    "temperature",
    "humidity",
    "aqi",
];

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Reading timestamp is not an ISO-8601 instant: {0:?}")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, LogError>;
