//! Environment configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `IQAIR_API_KEY` | required |
//! | `OPENWEATHER_API_KEY` | required |
//! | `AIR_GATEWAY_PORT` / `PORT` | `8000` |
//! | `READINGS_LOG_PATH` | `air_quality_readings.csv` |
//! | `COLLECT_INTERVAL_SECS` | `300` (must be > 0) |
//! | `COLLECT_CITY_DELAY_MS` | `1000` |
//! | `IQAIR_API_URL` | `http://api.airvisual.com/v2` |
//! | `OPENWEATHER_API_URL` | `https://api.openweathermap.org/data/2.5` |
//! | `OPENWEATHER_GEO_URL` | `https://api.openweathermap.org/geo/1.0` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use air_quality_client::UpstreamConfig;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_PATH: &str = "air_quality_readings.csv";
const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_CITY_DELAY_MS: u64 = 1000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// One city the collector polls. Names must match IQAir's spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityTarget {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl CityTarget {
    pub fn new(city: &str, state: &str, country: &str) -> Self {
        Self {
            city: city.to_string(),
            state: state.to_string(),
            country: country.to_string(),
        }
    }
}

impl fmt::Display for CityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.city, self.state, self.country)
    }
}

pub fn default_targets() -> Vec<CityTarget> {
    vec![
        CityTarget::new("São Paulo", "São Paulo", "Brazil"),
        CityTarget::new("Rio de Janeiro", "Rio de Janeiro", "Brazil"),
        CityTarget::new("Curitiba", "Parana", "Brazil"),
    ]
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub interval: Duration,
    pub city_delay: Duration,
    pub targets: Vec<CityTarget>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            city_delay: Duration::from_millis(DEFAULT_CITY_DELAY_MS),
            targets: default_targets(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub log_path: PathBuf,
    pub upstream: UpstreamConfig,
    pub collector: CollectorConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let iqair_key = get("IQAIR_API_KEY").ok_or(ConfigError::Missing("IQAIR_API_KEY"))?;
        let owm_key =
            get("OPENWEATHER_API_KEY").ok_or(ConfigError::Missing("OPENWEATHER_API_KEY"))?;

        let mut upstream = UpstreamConfig::new(iqair_key, owm_key);
        if let Some(url) = get("IQAIR_API_URL") {
            upstream.iqair_base_url = url;
        }
        if let Some(url) = get("OPENWEATHER_API_URL") {
            upstream.openweather_base_url = url;
        }
        if let Some(url) = get("OPENWEATHER_GEO_URL") {
            upstream.geocoding_base_url = url;
        }

        let port = match get("AIR_GATEWAY_PORT") {
            Some(raw) => parse_var("AIR_GATEWAY_PORT", raw)?,
            None => match get("PORT") {
                Some(raw) => parse_var("PORT", raw)?,
                None => DEFAULT_PORT,
            },
        };

        let interval_secs: u64 = match get("COLLECT_INTERVAL_SECS") {
            Some(raw) => parse_var("COLLECT_INTERVAL_SECS", raw)?,
            None => DEFAULT_INTERVAL_SECS,
        };
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "COLLECT_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let city_delay_ms: u64 = match get("COLLECT_CITY_DELAY_MS") {
            Some(raw) => parse_var("COLLECT_CITY_DELAY_MS", raw)?,
            None => DEFAULT_CITY_DELAY_MS,
        };

        Ok(Self {
            port,
            log_path: get("READINGS_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            upstream,
            collector: CollectorConfig {
                interval: Duration::from_secs(interval_secs),
                city_delay: Duration::from_millis(city_delay_ms),
                targets: default_targets(),
            },
        })
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}
