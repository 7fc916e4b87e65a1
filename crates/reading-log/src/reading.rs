use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: String,
    pub city: String,
    pub state: String,
    pub country: String,
    /// Holds the upstream US AQI, not a PM2.5 concentration. The column keeps
    /// its historical name so existing log files stay readable.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pm25: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub aqi: Option<f64>,
}

impl Reading {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Parse an ISO-8601 instant (`Z` or numeric offset). Naive timestamps
/// without an offset are rejected.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_upstream_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-06-01T12:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01T12:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01T09:00:00-03:00"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_non_instants() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-06-01T12:00:00"), None);
    }
}
