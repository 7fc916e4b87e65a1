//! Upstream Air Quality Client
//!
//! Thin async wrapper over the two providers the gateway aggregates:
//!
//! | Provider | Endpoint | Used for |
//! |----------|----------|----------|
//! | IQAir (AirVisual v2) | `countries`, `states`, `cities`, `city` | Location listings, current conditions |
//! | OpenWeatherMap | `geo/1.0/direct` | Geocoding a city name |
//! | OpenWeatherMap | `data/2.5/air_pollution/history` | 24h pollution history |
//!
//! Every call is a single GET with no retries. Failures surface as
//! [`UpstreamError`]:
//!
//! - `Rejected`: the provider answered but refused (non-success status field
//!   or non-2xx HTTP status), with the provider's message.
//! - `Unreachable`: transport failure or timeout.
//! - `Malformed`: the body did not have the expected shape, or was larger
//!   than `max_body_bytes`.
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = UpstreamClient::new(UpstreamConfig::new(iqair_key, owm_key))?;
//! let current = client.fetch_current("Curitiba", "Parana", "Brazil").await?;
//! let coords = client.geocode("Curitiba", None, Some("BR")).await?;
//! ```

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub mod iqair;
pub mod openweather;
pub mod types;

pub use types::{CityEntry, Coordinate, CountryEntry, CurrentConditions, PollutionSample, StateEntry};

pub const IQAIR_DEFAULT_URL: &str = "http://api.airvisual.com/v2";
pub const OPENWEATHER_DEFAULT_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const OPENWEATHER_GEO_DEFAULT_URL: &str = "https://api.openweathermap.org/geo/1.0";

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Upstream provider, used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    IqAir,
    OpenWeather,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IqAir => write!(f, "IQAir"),
            Self::OpenWeather => write!(f, "OpenWeatherMap"),
        }
    }
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{provider} rejected the request: {message}")]
    Rejected {
        provider: Provider,
        status: Option<u16>,
        message: String,
    },
    #[error("{provider} unreachable: {source}")]
    Unreachable {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned an unexpected payload: {detail}")]
    Malformed { provider: Provider, detail: String },
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Upstream client configuration
#[derive(Clone)]
pub struct UpstreamConfig {
    pub iqair_api_key: String,
    pub openweather_api_key: String,
    pub iqair_base_url: String,
    pub openweather_base_url: String,
    pub geocoding_base_url: String,
    /// Connect timeout in seconds (default: 5)
    pub connect_timeout_sec: u64,
    /// Total request timeout in seconds (default: 30)
    pub timeout_sec: u64,
    /// Largest response body accepted, in bytes (default: 2 MiB)
    pub max_body_bytes: usize,
}

impl UpstreamConfig {
    pub fn new(iqair_api_key: impl Into<String>, openweather_api_key: impl Into<String>) -> Self {
        Self {
            iqair_api_key: iqair_api_key.into(),
            openweather_api_key: openweather_api_key.into(),
            iqair_base_url: IQAIR_DEFAULT_URL.to_string(),
            openweather_base_url: OPENWEATHER_DEFAULT_URL.to_string(),
            geocoding_base_url: OPENWEATHER_GEO_DEFAULT_URL.to_string(),
            connect_timeout_sec: 5,
            timeout_sec: 30,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

// API keys stay out of logs.
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("iqair_base_url", &self.iqair_base_url)
            .field("openweather_base_url", &self.openweather_base_url)
            .field("geocoding_base_url", &self.geocoding_base_url)
            .field("connect_timeout_sec", &self.connect_timeout_sec)
            .field("timeout_sec", &self.timeout_sec)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

/// Shared client for both providers. Holds one connection pool.
pub struct UpstreamClient {
    config: UpstreamConfig,
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_sec))
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Non-2xx responses become `Rejected`, using the provider's own error
    /// message when the body carries one. Bodies over `max_body_bytes` are
    /// `Malformed`.
    async fn get_json(
        &self,
        provider: Provider,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        tracing::debug!("{} GET {}", provider, url);

        let mut response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| UpstreamError::Unreachable { provider, source })?;

        let status = response.status();
        let limit = self.config.max_body_bytes;
        let too_large = || UpstreamError::Malformed {
            provider,
            detail: format!("response body exceeds {} bytes", limit),
        };

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| UpstreamError::Unreachable { provider, source })?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| {
                    let text = String::from_utf8_lossy(&body);
                    format!("HTTP {}: {}", status.as_u16(), text.trim())
                });
            return Err(UpstreamError::Rejected {
                provider,
                status: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| UpstreamError::Malformed {
            provider,
            detail: e.to_string(),
        })
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Provider error text: IQAir nests it under `data.message`, OpenWeatherMap
/// puts it at the top level.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    body.pointer("/data/message")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
