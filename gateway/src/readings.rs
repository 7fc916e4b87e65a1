//! Glue between upstream conditions and the reading log. Log I/O runs on the
//! blocking pool.

use std::sync::Arc;

use air_quality_client::CurrentConditions;
use chrono::{DateTime, Utc};
use reading_log::{parse_timestamp, LogError, Reading, ReadingLog};

use crate::config::CityTarget;

/// Build the row persisted for a current-conditions fetch.
///
/// Uses the upstream `weather.ts` when it is a valid instant, otherwise `now`.
/// Both `pm25` and `aqi` carry the US AQI; `pm25` is a legacy column name.
pub fn from_current(target: &CityTarget, current: &CurrentConditions, now: DateTime<Utc>) -> Reading {
    let timestamp = current
        .timestamp
        .as_deref()
        .filter(|ts| parse_timestamp(ts).is_some())
        .map(str::to_string)
        .unwrap_or_else(|| now.to_rfc3339());

    Reading {
        timestamp,
        city: target.city.clone(),
        state: target.state.clone(),
        country: target.country.clone(),
        pm25: current.aqi_us,
        temperature: current.temperature,
        humidity: current.humidity,
        aqi: current.aqi_us,
    }
}

pub async fn append(log: Arc<ReadingLog>, reading: Reading) -> Result<(), LogError> {
    tokio::task::spawn_blocking(move || log.append(&reading))
        .await
        .map_err(|e| LogError::Io(std::io::Error::other(e)))?
}

pub async fn query(
    log: Arc<ReadingLog>,
    city: Option<String>,
    window_hours: i64,
) -> Result<Vec<Reading>, LogError> {
    tokio::task::spawn_blocking(move || log.query(city.as_deref(), window_hours))
        .await
        .map_err(|e| LogError::Io(std::io::Error::other(e)))?
}
