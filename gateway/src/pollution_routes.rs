//! OpenWeatherMap-backed routes: geocoding and 24h pollution history

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use air_quality_client::{Coordinate, PollutionSample};

use crate::error::ApiError;
use crate::routes::AppState;

/// State and country narrow the geocoding match; both optional.
#[derive(Deserialize)]
pub struct OptionalLocationQuery {
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Deserialize)]
pub struct GeocodeQuery {
    pub city: String,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// One point of `/cities/{city}/pm25/24h`. `value` mirrors `pm25`.
#[derive(Debug, Serialize)]
pub struct Pm25Point {
    pub timestamp: String,
    pub value: Option<f64>,
    pub pm25: Option<f64>,
    pub aqi: Option<u32>,
}

impl From<PollutionSample> for Pm25Point {
    fn from(sample: PollutionSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            value: sample.pm25,
            pm25: sample.pm25,
            aqi: sample.aqi,
        }
    }
}

#[derive(Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize)]
pub struct PollutionResponse {
    pub city: String,
    pub country: String,
    pub coordinates: LatLon,
    pub data: Vec<PollutionSample>,
}

async fn resolve(
    state: &AppState,
    city: &str,
    region: Option<&str>,
    country: Option<&str>,
) -> Result<Coordinate, ApiError> {
    let found = state
        .client
        .geocode(city, region, country)
        .await
        .map_err(|e| state.fail(e, &format!("geocode {}", city)))?;

    found.ok_or_else(|| {
        ApiError::NotFound(format!(
            "City '{}' not found. Try adding state and country.",
            city
        ))
    })
}

async fn history_for(
    state: &AppState,
    city: &str,
    query: &OptionalLocationQuery,
) -> Result<(Coordinate, Vec<PollutionSample>), ApiError> {
    let coords = resolve(state, city, query.state.as_deref(), query.country.as_deref()).await?;
    let samples = state
        .client
        .fetch_history_24h(coords.lat, coords.lon)
        .await
        .map_err(|e| state.fail(e, &format!("pollution history {}", city)))?;
    Ok((coords, samples))
}

/// PM2.5 and AQI series for the last 24h.
pub async fn get_pm25_24h(
    State(state): State<AppState>,
    Path(city): Path<String>,
    query: Result<Query<OptionalLocationQuery>, QueryRejection>,
) -> Result<Json<Vec<Pm25Point>>, ApiError> {
    let Query(query) = query?;
    let (_, samples) = history_for(&state, &city, &query).await?;
    Ok(Json(samples.into_iter().map(Pm25Point::from).collect()))
}

/// All pollutants for the last 24h, with the resolved location.
pub async fn get_pollution_24h(
    State(state): State<AppState>,
    Path(city): Path<String>,
    query: Result<Query<OptionalLocationQuery>, QueryRejection>,
) -> Result<Json<PollutionResponse>, ApiError> {
    let Query(query) = query?;
    let (coords, data) = history_for(&state, &city, &query).await?;
    Ok(Json(PollutionResponse {
        city: coords.name,
        country: coords.country,
        coordinates: LatLon {
            lat: coords.lat,
            lon: coords.lon,
        },
        data,
    }))
}

pub async fn geocode_city(
    State(state): State<AppState>,
    query: Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Json<Coordinate>, ApiError> {
    let Query(query) = query?;
    let coords = resolve(
        &state,
        &query.city,
        query.state.as_deref(),
        query.country.as_deref(),
    )
    .await?;
    Ok(Json(coords))
}
