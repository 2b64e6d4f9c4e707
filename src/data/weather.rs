//! OpenWeatherMap API client
//!
//! This module fetches current conditions and the five-day/three-hour
//! forecast from OpenWeatherMap and parses them into our weather types.
//! All requests use metric units; conversion happens at display time.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::{Coordinates, CurrentWeather, Forecast, ForecastSlot, WeatherCondition};

/// Base URL for the OpenWeatherMap API
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// No API key configured
    #[error("No OpenWeatherMap API key configured (set OPENWEATHER_API_KEY)")]
    MissingApiKey,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Weather API returned status {0}")]
    Status(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

/// Client for fetching weather data from OpenWeatherMap
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    /// Create a new WeatherClient against the given API root
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create a new WeatherClient with a custom HTTP client
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Fetch current conditions for the given coordinates
    pub async fn fetch_current(&self, at: Coordinates) -> Result<CurrentWeather, WeatherError> {
        let text = self.get("/data/2.5/weather", at).await?;
        let response: CurrentResponse = serde_json::from_str(&text)?;
        parse_current(response)
    }

    /// Fetch the five-day forecast in three-hour steps
    pub async fn fetch_forecast(&self, at: Coordinates) -> Result<Forecast, WeatherError> {
        let text = self.get("/data/2.5/forecast", at).await?;
        let response: ForecastResponse = serde_json::from_str(&text)?;
        parse_forecast(response)
    }

    async fn get(&self, path: &str, at: Coordinates) -> Result<String, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, lat = at.latitude, lon = at.longitude, "weather request");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Parse the current-weather response into a CurrentWeather struct
fn parse_current(response: CurrentResponse) -> Result<CurrentWeather, WeatherError> {
    let summary = response
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::MissingField("weather".to_string()))?;

    Ok(CurrentWeather {
        temperature: response.main.temp,
        feels_like: response.main.feels_like,
        humidity: response.main.humidity.clamp(0.0, 100.0) as u8,
        pressure: response.main.pressure,
        condition: WeatherCondition::from_group(&summary.main),
        description: summary.description,
        observed_at: parse_timestamp(response.dt)?,
    })
}

/// Parse the forecast response, dropping nothing and keeping API order
fn parse_forecast(response: ForecastResponse) -> Result<Forecast, WeatherError> {
    let mut slots = Vec::with_capacity(response.list.len());

    for item in response.list {
        let condition = item
            .weather
            .first()
            .map(|w| WeatherCondition::from_group(&w.main))
            .unwrap_or(WeatherCondition::Other);

        slots.push(ForecastSlot {
            time: parse_timestamp(item.dt)?,
            temperature: item.main.temp,
            condition,
            precipitation_chance: item.pop.unwrap_or(0.0),
            rain_3h: item.rain.and_then(|r| r.three_hours),
        });
    }

    Ok(Forecast { slots })
}

/// Convert a Unix timestamp in seconds to a UTC datetime
fn parse_timestamp(seconds: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| WeatherError::MissingField(format!("valid dt (got {})", seconds)))
}

/// Current-weather response structure
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    weather: Vec<WeatherSummary>,
    main: MainReadings,
    dt: i64,
}

/// Entry of the `weather` array
#[derive(Debug, Deserialize)]
struct WeatherSummary {
    main: String,
    #[serde(default)]
    description: String,
}

/// The `main` block shared by both endpoints
#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: f64,
}

/// Forecast response structure
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: MainReadings,
    #[serde(default)]
    weather: Vec<WeatherSummary>,
    pop: Option<f64>,
    rain: Option<RainVolume>,
}

#[derive(Debug, Deserialize)]
struct RainVolume {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample valid current-weather response
    const CURRENT_RESPONSE: &str = r#"{
        "coord": {"lon": -123.12, "lat": 49.28},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "base": "stations",
        "main": {
            "temp": 12.6,
            "feels_like": 11.9,
            "temp_min": 11.0,
            "temp_max": 13.8,
            "pressure": 1021,
            "humidity": 81
        },
        "visibility": 10000,
        "wind": {"speed": 3.6, "deg": 250},
        "dt": 1721052000,
        "name": "Vancouver"
    }"#;

    /// Sample forecast response with two slots
    const FORECAST_RESPONSE: &str = r#"{
        "cod": "200",
        "cnt": 2,
        "list": [
            {
                "dt": 1721055600,
                "main": {"temp": 14.2, "feels_like": 13.5, "pressure": 1020, "humidity": 75},
                "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}],
                "pop": 0.2
            },
            {
                "dt": 1721066400,
                "main": {"temp": 15.9, "feels_like": 15.1, "pressure": 1019, "humidity": 70},
                "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
                "pop": 0.64,
                "rain": {"3h": 1.25}
            }
        ]
    }"#;

    #[test]
    fn test_parse_current_response() {
        let response: CurrentResponse = serde_json::from_str(CURRENT_RESPONSE).unwrap();
        let current = parse_current(response).expect("Failed to parse weather");

        assert!((current.temperature - 12.6).abs() < 0.01);
        assert!((current.feels_like - 11.9).abs() < 0.01);
        assert_eq!(current.humidity, 81);
        assert!((current.pressure - 1021.0).abs() < 0.01);
        assert_eq!(current.condition, WeatherCondition::Rain);
        assert_eq!(current.description, "light rain");
        assert_eq!(current.observed_at.timestamp(), 1_721_052_000);
    }

    #[test]
    fn test_parse_current_without_weather_entry() {
        let response: CurrentResponse = serde_json::from_str(
            r#"{"weather": [], "main": {"temp": 1.0}, "dt": 0}"#,
        )
        .unwrap();

        assert!(matches!(
            parse_current(response),
            Err(WeatherError::MissingField(field)) if field == "weather"
        ));
    }

    #[test]
    fn test_parse_forecast_response() {
        let response: ForecastResponse = serde_json::from_str(FORECAST_RESPONSE).unwrap();
        let forecast = parse_forecast(response).unwrap();

        assert_eq!(forecast.slots.len(), 2);
        assert_eq!(forecast.slots[0].condition, WeatherCondition::Clouds);
        assert_eq!(forecast.slots[0].rain_3h, None);
        assert!((forecast.slots[1].precipitation_chance - 0.64).abs() < 1e-9);
        assert_eq!(forecast.slots[1].rain_3h, Some(1.25));
        assert!(forecast.slots[0].time < forecast.slots[1].time);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let client = WeatherClient::new("http://127.0.0.1:9", None).unwrap();
        let at = Coordinates::new(49.28, -123.12).unwrap();

        let result = client.fetch_current(at).await;

        assert!(matches!(result, Err(WeatherError::MissingApiKey)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = WeatherClient::with_client(Client::new(), "http://example.test/", None);
        assert_eq!(client.base_url, "http://example.test");
    }
}
