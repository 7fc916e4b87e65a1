//! Router, shared state and the IQAir-backed routes
//!
//! Routes backed by OpenWeatherMap live in `pollution_routes`, routes backed
//! by the reading log in `history_routes`.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use air_quality_client::{CityEntry, CountryEntry, StateEntry, UpstreamClient};
use reading_log::ReadingLog;

use crate::config::CityTarget;
use crate::error::ApiError;
use crate::reporter::ErrorReporter;
use crate::{history_routes, pollution_routes, readings};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<UpstreamClient>,
    pub log: Arc<ReadingLog>,
    pub reporter: Arc<dyn ErrorReporter>,
}

impl AppState {
    /// Report `err` (unless it is a validation error) and hand it back.
    pub fn fail(&self, err: impl Into<ApiError>, context: &str) -> ApiError {
        let err = err.into();
        if let Some(kind) = err.kind() {
            self.reporter.report(kind, &format!("{}: {}", context, err));
        }
        err
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/countries", get(list_countries))
        .route("/states", get(list_states))
        .route("/cities", get(list_cities))
        .route("/cities/:city/current", get(get_current))
        .route("/cities/:city/pm25/24h", get(pollution_routes::get_pm25_24h))
        .route("/cities/:city/pollution/24h", get(pollution_routes::get_pollution_24h))
        .route("/cities/:city/history", get(history_routes::get_city_history))
        .route("/geocode", get(pollution_routes::geocode_city))
        .route("/history/all", get(history_routes::get_all_history))
        .route("/debug/raw/:city", get(debug_raw))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(serde_json::json!({
        "message": "Hybrid Air Quality API",
        "service": "air-quality-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "features": {
            "iqair": "Current conditions (US AQI, temperature, humidity)",
            "openweathermap": "24h history (PM2.5, PM10, AQI, CO, NO2, O3, SO2)",
            "collector": "Scheduled readings stored in a local CSV log"
        },
        "endpoints": {
            "countries": "/countries",
            "states": "/states?country=",
            "cities": "/cities?state=&country=",
            "current": "/cities/{city}/current?state=&country=",
            "pm25_24h": "/cities/{city}/pm25/24h",
            "pollution_24h": "/cities/{city}/pollution/24h",
            "geocode": "/geocode?city=",
            "history": "/cities/{city}/history?hours=24",
            "history_all": "/history/all?hours=24"
        }
    }))
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "air-quality-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Deserialize)]
pub struct CountryQuery {
    pub country: String,
}

#[derive(Deserialize)]
pub struct LocationQuery {
    pub state: String,
    pub country: String,
}

/// Response of `/cities/{city}/current`
#[derive(Serialize)]
pub struct CurrentResponse {
    pub source_api: &'static str,
    /// US AQI, not a concentration. Named `pm25` for client compatibility.
    pub pm25: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: Option<String>,
    pub raw_data: Value,
}

async fn list_countries(State(state): State<AppState>) -> Result<Json<Vec<CountryEntry>>, ApiError> {
    let countries = state
        .client
        .list_countries()
        .await
        .map_err(|e| state.fail(e, "countries"))?;
    Ok(Json(countries))
}

async fn list_states(
    State(state): State<AppState>,
    query: Result<Query<CountryQuery>, QueryRejection>,
) -> Result<Json<Vec<StateEntry>>, ApiError> {
    let Query(query) = query?;
    let states = state
        .client
        .list_states(&query.country)
        .await
        .map_err(|e| state.fail(e, &format!("states of {}", query.country)))?;
    Ok(Json(states))
}

async fn list_cities(
    State(state): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<Vec<CityEntry>>, ApiError> {
    let Query(query) = query?;
    let cities = state
        .client
        .list_cities(&query.state, &query.country)
        .await
        .map_err(|e| state.fail(e, &format!("cities of {}/{}", query.state, query.country)))?;
    Ok(Json(cities))
}

/// Current conditions from IQAir. Also appends a reading to the log.
async fn get_current(
    State(state): State<AppState>,
    Path(city): Path<String>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<CurrentResponse>, ApiError> {
    let Query(query) = query?;
    let target = CityTarget {
        city,
        state: query.state,
        country: query.country,
    };

    let current = state
        .client
        .fetch_current(&target.city, &target.state, &target.country)
        .await
        .map_err(|e| state.fail(e, &format!("current {}", target)))?;

    let reading = readings::from_current(&target, &current, Utc::now());
    readings::append(Arc::clone(&state.log), reading)
        .await
        .map_err(|e| state.fail(e, &format!("store current {}", target)))?;

    Ok(Json(CurrentResponse {
        source_api: "iqair",
        pm25: current.aqi_us,
        temperature: current.temperature,
        humidity: current.humidity,
        timestamp: current.timestamp,
        raw_data: current.raw,
    }))
}

/// Raw IQAir `city` body, for inspecting upstream structure.
async fn debug_raw(
    State(state): State<AppState>,
    Path(city): Path<String>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    match state
        .client
        .fetch_current_raw(&city, &query.state, &query.country)
        .await
    {
        Ok(body) => Ok(Json(body)),
        Err(e) => Ok(Json(serde_json::json!({ "error": e.to_string() }))),
    }
}
