//! Core data models for skywatch
//!
//! This module contains the weather, forecast and place types shared by the
//! HTTP clients, the cached service layer and the renderers. Every type that
//! comes back from a remote call is `Serialize + Deserialize` so it can be
//! stored in the response cache as-is.

pub mod geocode;
pub mod metrics;
pub mod weather;

pub use geocode::{GeocodeClient, GeocodeError};
pub use weather::{WeatherClient, WeatherError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for coordinates outside the valid range
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is outside -90..=90")]
    Latitude(f64),

    #[error("Longitude {0} is outside -180..=180")]
    Longitude(f64),
}

/// A geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Creates coordinates, rejecting values off the globe (and NaN)
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds the cache key for one endpoint at this position
    ///
    /// Coordinates are rounded to one decimal (about 11 km) so nearby
    /// requests share an entry, e.g. `weather_49.3_-123.2`.
    pub fn cache_key(&self, endpoint: &str) -> String {
        format!("{}_{:.1}_{:.1}", endpoint, self.latitude, self.longitude)
    }

    /// Whether two positions denote the same saved place
    pub fn same_place(&self, other: &Coordinates) -> bool {
        (self.latitude - other.latitude).abs() < 1e-6
            && (self.longitude - other.longitude).abs() < 1e-6
    }
}

/// A named place, as returned by geocoding or saved by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Country name or ISO code, empty when unknown
    #[serde(default)]
    pub country: String,
    pub coordinates: Coordinates,
}

impl Place {
    /// "Name, Country", or just the name when the country is unknown
    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

/// Current conditions at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Sea-level pressure in hPa
    pub pressure: f64,
    pub condition: WeatherCondition,
    /// Free-text description from the provider, e.g. "light rain"
    pub description: String,
    /// Observation time reported by the provider
    pub observed_at: DateTime<Utc>,
}

/// One three-hour step of the five-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub time: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    pub condition: WeatherCondition,
    /// Probability of precipitation (0.0-1.0)
    pub precipitation_chance: f64,
    /// Rain volume for the three hours, in mm
    pub rain_3h: Option<f64>,
}

/// Five-day forecast in three-hour steps, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub slots: Vec<ForecastSlot>,
}

/// Condition groups reported by the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    /// Haze, smoke, dust and other atmosphere groups
    Other,
}

impl WeatherCondition {
    /// Maps the provider's `main` group name, case-insensitively
    pub fn from_group(group: &str) -> Self {
        match group.to_ascii_lowercase().as_str() {
            "clear" => WeatherCondition::Clear,
            "clouds" => WeatherCondition::Clouds,
            "rain" => WeatherCondition::Rain,
            "drizzle" => WeatherCondition::Drizzle,
            "thunderstorm" => WeatherCondition::Thunderstorm,
            "snow" => WeatherCondition::Snow,
            "mist" => WeatherCondition::Mist,
            "fog" => WeatherCondition::Fog,
            _ => WeatherCondition::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Clouds => "Clouds",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Mist => "Mist",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Other => "Other",
        }
    }

    /// Icon name for the condition
    pub fn icon(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "sunny",
            WeatherCondition::Clouds => "cloudy",
            WeatherCondition::Rain | WeatherCondition::Drizzle => "rainy",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Mist | WeatherCondition::Fog => "cloudy-night",
            WeatherCondition::Other => "partly-sunny",
        }
    }
}
