//! IQAir (AirVisual v2) endpoints
//!
//! Every IQAir body is an envelope `{"status": "success" | "fail", "data": ...}`.
//! City, state and country must match IQAir's spelling exactly.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{CityEntry, CountryEntry, CurrentConditions, StateEntry};
use crate::{error_message, join_url, Provider, Result, UpstreamClient, UpstreamError};

#[derive(Debug, Default, Deserialize)]
struct CityData {
    current: Option<Current>,
}

#[derive(Debug, Default, Deserialize)]
struct Current {
    weather: Option<Weather>,
    pollution: Option<Pollution>,
}

#[derive(Debug, Default, Deserialize)]
struct Weather {
    ts: Option<String>,
    tp: Option<f64>,
    hu: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Pollution {
    aqius: Option<f64>,
}

impl UpstreamClient {
    /// All countries IQAir has stations in.
    pub async fn list_countries(&self) -> Result<Vec<CountryEntry>> {
        let body = self.iqair_get("countries", &[]).await?;
        parse_listing(&body)
    }

    pub async fn list_states(&self, country: &str) -> Result<Vec<StateEntry>> {
        let body = self.iqair_get("states", &[("country", country)]).await?;
        parse_listing(&body)
    }

    pub async fn list_cities(&self, state: &str, country: &str) -> Result<Vec<CityEntry>> {
        let body = self
            .iqair_get("cities", &[("state", state), ("country", country)])
            .await?;
        parse_listing(&body)
    }

    /// Current weather and pollution for one city.
    pub async fn fetch_current(
        &self,
        city: &str,
        state: &str,
        country: &str,
    ) -> Result<CurrentConditions> {
        let body = self.fetch_current_raw(city, state, country).await?;
        parse_current(body)
    }

    /// Untouched `city` body, status field not checked.
    pub async fn fetch_current_raw(&self, city: &str, state: &str, country: &str) -> Result<Value> {
        self.iqair_get("city", &[("city", city), ("state", state), ("country", country)])
            .await
    }

    async fn iqair_get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = join_url(&self.config.iqair_base_url, path);
        let mut query: Vec<(&str, String)> = params
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        query.push(("key", self.config.iqair_api_key.clone()));

        self.get_json(Provider::IqAir, &url, &query).await
    }
}

/// Fail with `Rejected` unless the envelope says `"success"`.
pub fn check_status(body: &Value) -> Result<()> {
    match body.get("status").and_then(Value::as_str) {
        Some("success") => Ok(()),
        other => Err(UpstreamError::Rejected {
            provider: Provider::IqAir,
            status: None,
            message: error_message(body)
                .unwrap_or_else(|| format!("status {}", other.unwrap_or("missing"))),
        }),
    }
}

/// Decode a `countries` / `states` / `cities` envelope.
pub fn parse_listing<T: DeserializeOwned>(body: &Value) -> Result<Vec<T>> {
    check_status(body)?;
    match body.get("data") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(data) => Vec::<T>::deserialize(data).map_err(|e| malformed(e.to_string())),
    }
}

/// Decode a `city` envelope into [`CurrentConditions`], keeping the body as `raw`.
pub fn parse_current(body: Value) -> Result<CurrentConditions> {
    check_status(&body)?;

    let data = match body.get("data") {
        Some(data) => CityData::deserialize(data).map_err(|e| malformed(e.to_string()))?,
        None => CityData::default(),
    };
    let current = data.current.unwrap_or_default();
    let weather = current.weather.unwrap_or_default();
    let pollution = current.pollution.unwrap_or_default();

    if pollution.aqius.is_none() {
        tracing::debug!("IQAir pollution block has no aqius: {:?}", body.pointer("/data/current/pollution"));
    }

    Ok(CurrentConditions {
        aqi_us: pollution.aqius,
        temperature: weather.tp,
        humidity: weather.hu,
        timestamp: weather.ts,
        raw: body,
    })
}

fn malformed(detail: String) -> UpstreamError {
    UpstreamError::Malformed {
        provider: Provider::IqAir,
        detail,
    }
}
