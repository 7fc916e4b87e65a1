use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current conditions for one city, as reported by IQAir.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    /// US AQI (`pollution.aqius`). IQAir does not expose the raw PM2.5
    /// concentration on this endpoint.
    pub aqi_us: Option<f64>,
    /// Degrees Celsius (`weather.tp`)
    pub temperature: Option<f64>,
    /// Relative humidity percent (`weather.hu`)
    pub humidity: Option<f64>,
    /// `weather.ts` as sent upstream
    pub timestamp: Option<String>,
    /// Full upstream body
    pub raw: Value,
}

/// Geocoding result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub country: String,
}

/// One hourly point of OpenWeatherMap pollution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutionSample {
    pub timestamp: String,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    /// OpenWeatherMap index, 1 (good) to 5 (very poor)
    pub aqi: Option<u32>,
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityEntry {
    pub city: String,
}
