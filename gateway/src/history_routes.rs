//! Reading log routes

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use reading_log::Reading;

use crate::error::ApiError;
use crate::readings;
use crate::routes::AppState;

const DEFAULT_HOURS: i64 = 24;

fn default_hours() -> i64 {
    DEFAULT_HOURS
}

#[derive(Deserialize)]
pub struct HoursQuery {
    #[serde(default = "default_hours")]
    pub hours: i64,
}

#[derive(Serialize)]
pub struct CityHistoryResponse {
    pub city: String,
    pub hours: i64,
    pub total_records: usize,
    pub data: Vec<Reading>,
}

#[derive(Serialize)]
pub struct AllHistoryResponse {
    pub hours: i64,
    pub total_records: usize,
    /// Distinct city names present in `data`, sorted
    pub cities: BTreeSet<String>,
    pub data: Vec<Reading>,
}

/// Stored readings for one city. 404 when the window is empty.
pub async fn get_city_history(
    State(state): State<AppState>,
    Path(city): Path<String>,
    query: Result<Query<HoursQuery>, QueryRejection>,
) -> Result<Json<CityHistoryResponse>, ApiError> {
    let Query(HoursQuery { hours }) = query?;

    let data = readings::query(Arc::clone(&state.log), Some(city.clone()), hours)
        .await
        .map_err(|e| state.fail(e, &format!("history {}", city)))?;

    if data.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No readings for '{}' in the last {} hours",
            city, hours
        )));
    }

    Ok(Json(CityHistoryResponse {
        city,
        hours,
        total_records: data.len(),
        data,
    }))
}

/// Stored readings for every city.
pub async fn get_all_history(
    State(state): State<AppState>,
    query: Result<Query<HoursQuery>, QueryRejection>,
) -> Result<Json<AllHistoryResponse>, ApiError> {
    let Query(HoursQuery { hours }) = query?;

    let data = readings::query(Arc::clone(&state.log), None, hours)
        .await
        .map_err(|e| state.fail(e, "history all"))?;

    let cities = data.iter().map(|r| r.city.clone()).collect();
    Ok(Json(AllHistoryResponse {
        hours,
        total_records: data.len(),
        cities,
        data,
    }))
}
