//! OpenWeatherMap geocoding and air pollution history

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::types::{Coordinate, PollutionSample};
use crate::{join_url, Provider, Result, UpstreamClient, UpstreamError};

/// Geocoding body. The provider returns a bare array; an enveloped
/// `{"status": ..., "data": [...]}` form is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeocodeBody {
    Bare(Vec<GeocodeHit>),
    Wrapped {
        #[serde(default)]
        data: Vec<GeocodeHit>,
    },
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: f64,
    lon: f64,
    name: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    list: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    dt: i64,
    #[serde(default)]
    main: HistoryMain,
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryMain {
    aqi: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    co: Option<f64>,
    no2: Option<f64>,
    o3: Option<f64>,
    so2: Option<f64>,
}

impl UpstreamClient {
    /// Resolve a city name to coordinates. `Ok(None)` when nothing matches.
    pub async fn geocode(
        &self,
        city: &str,
        state: Option<&str>,
        country: Option<&str>,
    ) -> Result<Option<Coordinate>> {
        let url = join_url(&self.config.geocoding_base_url, "direct");
        let query = [
            ("q", geocode_query(city, state, country)),
            ("limit", "1".to_string()),
            ("appid", self.config.openweather_api_key.clone()),
        ];

        let body = self.get_json(Provider::OpenWeather, &url, &query).await?;
        parse_geocode(&body, city)
    }

    /// Hourly pollution samples for the last 24 hours, in upstream order.
    pub async fn fetch_history_24h(&self, lat: f64, lon: f64) -> Result<Vec<PollutionSample>> {
        let (start, end) = history_window(Utc::now());
        let url = join_url(&self.config.openweather_base_url, "air_pollution/history");
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("appid", self.config.openweather_api_key.clone()),
        ];

        let body = self.get_json(Provider::OpenWeather, &url, &query).await?;
        parse_history(&body)
    }
}

/// `city[,state][,country]`
pub fn geocode_query(city: &str, state: Option<&str>, country: Option<&str>) -> String {
    let mut query = city.to_string();
    for part in [state, country].into_iter().flatten() {
        if !part.is_empty() {
            query.push(',');
            query.push_str(part);
        }
    }
    query
}

/// `[now - 24h, now]` in epoch seconds.
pub fn history_window(now: DateTime<Utc>) -> (i64, i64) {
    let start = now - TimeDelta::hours(24);
    (start.timestamp(), now.timestamp())
}

/// First geocoding match. `fallback_name` stands in when the match has no name.
pub fn parse_geocode(body: &Value, fallback_name: &str) -> Result<Option<Coordinate>> {
    let hits = match GeocodeBody::deserialize(body).map_err(|e| malformed(e.to_string()))? {
        GeocodeBody::Bare(hits) => hits,
        GeocodeBody::Wrapped { data } => data,
    };

    Ok(hits.into_iter().next().map(|hit| Coordinate {
        lat: hit.lat,
        lon: hit.lon,
        name: hit.name.unwrap_or_else(|| fallback_name.to_string()),
        country: hit.country.unwrap_or_default(),
    }))
}

pub fn parse_history(body: &Value) -> Result<Vec<PollutionSample>> {
    let history = HistoryBody::deserialize(body).map_err(|e| malformed(e.to_string()))?;

    history
        .list
        .into_iter()
        .map(|item| {
            let ts = DateTime::<Utc>::from_timestamp(item.dt, 0)
                .ok_or_else(|| malformed(format!("timestamp out of range: {}", item.dt)))?;
            Ok(PollutionSample {
                timestamp: ts.to_rfc3339(),
                pm25: item.components.pm2_5,
                pm10: item.components.pm10,
                aqi: item.main.aqi,
                co: item.components.co,
                no2: item.components.no2,
                o3: item.components.o3,
                so2: item.components.so2,
            })
        })
        .collect()
}

fn malformed(detail: String) -> UpstreamError {
    UpstreamError::Malformed {
        provider: Provider::OpenWeather,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_geocode_query_omits_absent_parts() {
        assert_eq!(geocode_query("Curitiba", None, None), "Curitiba");
        assert_eq!(geocode_query("Curitiba", Some("Parana"), None), "Curitiba,Parana");
        assert_eq!(geocode_query("Curitiba", None, Some("BR")), "Curitiba,BR");
        assert_eq!(
            geocode_query("Curitiba", Some("Parana"), Some("BR")),
            "Curitiba,Parana,BR"
        );
    }

    #[test]
    fn test_history_window_is_24h() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let (start, end) = history_window(now);
        assert_eq!(end - start, 24 * 3600);
        assert_eq!(end, now.timestamp());
    }

    #[test]
    fn test_parse_geocode_first_hit() {
        let body = json!([
            {"name": "Curitiba", "lat": -25.4297, "lon": -49.2711, "country": "BR", "state": "Paraná"},
            {"name": "Other", "lat": 0.0, "lon": 0.0, "country": "XX"}
        ]);
        let coords = parse_geocode(&body, "curitiba").unwrap().unwrap();
        assert_eq!(coords.name, "Curitiba");
        assert_eq!(coords.country, "BR");
        assert_eq!(coords.lat, -25.4297);
    }

    #[test]
    fn test_parse_geocode_defaults() {
        let body = json!([{"lat": 1.5, "lon": 2.5}]);
        let coords = parse_geocode(&body, "Nowhere").unwrap().unwrap();
        assert_eq!(coords.name, "Nowhere");
        assert_eq!(coords.country, "");
    }

    #[test]
    fn test_empty_geocode_is_not_found() {
        assert_eq!(parse_geocode(&json!([]), "X").unwrap(), None);
        assert_eq!(
            parse_geocode(&json!({"status": "success", "data": []}), "X").unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_geocode_garbage() {
        let result = parse_geocode(&json!("nope"), "X");
        assert!(matches!(result, Err(UpstreamError::Malformed { .. })));
    }

    #[test]
    fn test_parse_history_keeps_order() {
        let body = json!({
            "coord": {"lon": -49.27, "lat": -25.43},
            "list": [
                {"dt": 1748779200, "main": {"aqi": 2}, "components": {"co": 230.3, "no2": 5.1, "o3": 60.2, "so2": 1.1, "pm2_5": 12.4, "pm10": 20.0, "nh3": 0.5}},
                {"dt": 1748775600, "main": {"aqi": 1}, "components": {"pm2_5": 8.0}}
            ]
        });
        let samples = parse_history(&body).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, "2025-06-01T12:00:00+00:00");
        assert_eq!(samples[0].pm25, Some(12.4));
        assert_eq!(samples[0].aqi, Some(2));
        assert_eq!(samples[1].timestamp, "2025-06-01T11:00:00+00:00");
        assert_eq!(samples[1].co, None);
    }

    #[test]
    fn test_parse_history_empty() {
        assert!(parse_history(&json!({"coord": {}})).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let mut config = crate::UpstreamConfig::new("k", "k");
        config.openweather_base_url = "http://127.0.0.1:9/data/2.5".to_string();
        config.geocoding_base_url = "http://127.0.0.1:9/geo/1.0".to_string();
        config.connect_timeout_sec = 1;
        config.timeout_sec = 2;
        let client = UpstreamClient::new(config).unwrap();

        let err = client.fetch_history_24h(-25.43, -49.27).await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Unreachable { provider: Provider::OpenWeather, .. }
        ));

        let err = client.geocode("Curitiba", None, None).await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Unreachable { provider: Provider::OpenWeather, .. }
        ));
    }
}
