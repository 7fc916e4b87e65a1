//! Local stand-in for IQAir and OpenWeatherMap, served on an ephemeral port.
//!
//! - IQAir `city`: `Atlantis` answers HTTP 400 `city_not_found`, `Ghost`
//!   answers 200 with a `fail` status, `NoTimestamp` omits `weather.ts`,
//!   anything else succeeds with `aqius=50, tp=25, hu=70`.
//! - Geocoding: queries starting with `TestCity` resolve, `Polar` resolves to
//!   an out-of-range latitude, everything else is an empty array.
//! - History: two samples, oldest first. Latitudes outside [-90, 90] answer
//!   HTTP 400 `wrong latitude`.

use std::collections::HashMap;
use std::sync::Arc;

use air_quality_client::{UpstreamClient, UpstreamConfig};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use reading_log::ReadingLog;
use serde_json::{json, Value};

use crate::reporter::RecordingReporter;
use crate::routes::AppState;

const IQAIR_KEY: &str = "test-iqair";
const OWM_KEY: &str = "test-owm";

type Params = Query<HashMap<String, String>>;
type Reply = (StatusCode, Json<Value>);

pub async fn spawn_stub() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub_router()).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Client config pointing every provider at `base`.
pub fn test_config(base: &str) -> UpstreamConfig {
    let mut config = UpstreamConfig::new(IQAIR_KEY, OWM_KEY);
    config.iqair_base_url = format!("{}/v2", base);
    config.openweather_base_url = format!("{}/data/2.5", base);
    config.geocoding_base_url = format!("{}/geo/1.0", base);
    config.connect_timeout_sec = 1;
    config.timeout_sec = 5;
    config
}

pub fn test_client(base: &str) -> Arc<UpstreamClient> {
    Arc::new(UpstreamClient::new(test_config(base)).unwrap())
}

pub fn test_state(base: &str, log: Arc<ReadingLog>) -> (AppState, Arc<RecordingReporter>) {
    state_with_config(test_config(base), log)
}

pub fn state_with_config(
    config: UpstreamConfig,
    log: Arc<ReadingLog>,
) -> (AppState, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let state = AppState {
        client: Arc::new(UpstreamClient::new(config).unwrap()),
        log,
        reporter: reporter.clone(),
    };
    (state, reporter)
}

fn stub_router() -> Router {
    Router::new()
        .route("/v2/countries", get(countries))
        .route("/v2/states", get(states))
        .route("/v2/cities", get(cities))
        .route("/v2/city", get(city))
        .route("/geo/1.0/direct", get(geocode))
        .route("/data/2.5/air_pollution/history", get(history))
}

fn iqair_fail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({"status": "fail", "data": {"message": message}})))
}

fn iqair_ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({"status": "success", "data": data})))
}

fn bad_key(p: &HashMap<String, String>) -> bool {
    p.get("key").map(String::as_str) != Some(IQAIR_KEY)
}

async fn countries(Query(p): Params) -> Reply {
    if bad_key(&p) {
        return iqair_fail(StatusCode::BAD_REQUEST, "incorrect_api_key");
    }
    iqair_ok(json!([{"country": "Brazil"}, {"country": "USA"}]))
}

async fn states(Query(p): Params) -> Reply {
    if bad_key(&p) {
        return iqair_fail(StatusCode::BAD_REQUEST, "incorrect_api_key");
    }
    match p.get("country").map(String::as_str) {
        Some("Brazil") => iqair_ok(json!([{"state": "Sao Paulo"}, {"state": "Rio de Janeiro"}])),
        _ => iqair_fail(StatusCode::BAD_REQUEST, "country_not_found"),
    }
}

async fn cities(Query(p): Params) -> Reply {
    if bad_key(&p) {
        return iqair_fail(StatusCode::BAD_REQUEST, "incorrect_api_key");
    }
    match (p.get("state").map(String::as_str), p.get("country").map(String::as_str)) {
        (Some("Sao Paulo"), Some("Brazil")) => {
            iqair_ok(json!([{"city": "Sao Paulo"}, {"city": "Campinas"}]))
        }
        _ => iqair_fail(StatusCode::BAD_REQUEST, "state_not_found"),
    }
}

async fn city(Query(p): Params) -> Reply {
    if bad_key(&p) {
        return iqair_fail(StatusCode::BAD_REQUEST, "incorrect_api_key");
    }
    let name = p.get("city").cloned().unwrap_or_default();
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

    match name.as_str() {
        "Atlantis" => iqair_fail(StatusCode::BAD_REQUEST, "city_not_found"),
        "Ghost" => iqair_fail(StatusCode::OK, "no_nearest_station"),
        "NoTimestamp" => iqair_ok(json!({
            "city": name,
            "current": {"weather": {"tp": 18, "hu": 90}, "pollution": {"aqius": 12}}
        })),
        _ => iqair_ok(json!({
            "city": name,
            "state": p.get("state"),
            "country": p.get("country"),
            "current": {
                "weather": {"ts": now, "tp": 25, "pr": 1012, "hu": 70, "ws": 3.1, "wd": 120, "ic": "02d"},
                "pollution": {"ts": now, "aqius": 50, "mainus": "p2", "aqicn": 17, "maincn": "p2"}
            }
        })),
    }
}

async fn geocode(Query(p): Params) -> Reply {
    if p.get("appid").map(String::as_str) != Some(OWM_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"cod": 401, "message": "Invalid API key"})));
    }
    let q = p.get("q").cloned().unwrap_or_default();
    if p.get("limit").map(String::as_str) != Some("1") {
        return (StatusCode::BAD_REQUEST, Json(json!({"cod": "400", "message": "limit expected"})));
    }
    if q.starts_with("TestCity") {
        (
            StatusCode::OK,
            Json(json!([{"name": "TestCity", "lat": -23.55, "lon": -46.63, "country": "BR", "state": "TestState"}])),
        )
    } else if q.starts_with("Polar") {
        (
            StatusCode::OK,
            Json(json!([{"name": "Polar", "lat": 123.0, "lon": 0.0, "country": "AQ"}])),
        )
    } else {
        (StatusCode::OK, Json(json!([])))
    }
}

async fn history(Query(p): Params) -> Reply {
    if p.get("appid").map(String::as_str) != Some(OWM_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"cod": 401, "message": "Invalid API key"})));
    }
    let window = |k: &str| p.get(k).and_then(|v| v.parse::<i64>().ok());
    let (Some(start), Some(end)) = (window("start"), window("end")) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"cod": "400", "message": "start/end required"})));
    };
    if end - start != 24 * 3600 || p.get("lon").is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"cod": "400", "message": "bad window"})));
    }
    match p.get("lat").and_then(|v| v.parse::<f64>().ok()) {
        Some(lat) if (-90.0..=90.0).contains(&lat) => {}
        _ => return (StatusCode::BAD_REQUEST, Json(json!({"cod": "400", "message": "wrong latitude"}))),
    }

    (
        StatusCode::OK,
        Json(json!({
            "coord": {"lon": -46.63, "lat": -23.55},
            "list": [
                {"dt": end - 3600, "main": {"aqi": 2}, "components": {"co": 201.9, "no": 0.1, "no2": 8.2, "o3": 41.5, "so2": 2.3, "pm2_5": 11.5, "pm10": 17.0, "nh3": 1.2}},
                {"dt": end, "main": {"aqi": 3}, "components": {"co": 230.3, "no2": 9.9, "o3": 50.0, "so2": 2.0, "pm2_5": 27.0, "pm10": 33.1}}
            ]
        })),
    )
}
