//! Weather service
//!
//! Routes every remote resource through the shared [`CachedFetcher`]: one
//! cache key per endpoint and rounded position, one remote operation per
//! resource. The location is always an argument; the service keeps no
//! notion of a "current" place.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CachedFetcher, FetchError, Fetched, StoreError, DEFAULT_MAX_AGE};
use crate::connectivity::ConnectivityOracle;
use crate::data::{
    metrics, Coordinates, CurrentWeather, Forecast, GeocodeClient, GeocodeError, Place,
    WeatherClient, WeatherError,
};

/// Default freshness window for reverse-geocoded place names
pub const DEFAULT_GEOCODE_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

const CURRENT_ENDPOINT: &str = "weather";
const FORECAST_ENDPOINT: &str = "forecast";
const GEOCODE_ENDPOINT: &str = "geocode";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cannot search while offline")]
    Offline,

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

pub type WeatherResult<T> = Result<Fetched<T>, FetchError<WeatherError>>;
pub type PlaceResult = Result<Fetched<Place>, FetchError<GeocodeError>>;

/// Current conditions and forecast for one position
#[derive(Debug)]
pub struct Conditions {
    pub coordinates: Coordinates,
    pub current: WeatherResult<CurrentWeather>,
    pub forecast: WeatherResult<Forecast>,
}

impl Conditions {
    /// True when neither current conditions nor a forecast could be produced
    pub fn is_empty(&self) -> bool {
        self.current.is_err() && self.forecast.is_err()
    }

    /// Forecast high and low for the next 24 hours
    pub fn high_low(&self, now: DateTime<Utc>) -> Option<(f64, f64)> {
        let forecast = self.forecast.as_ref().ok()?;
        metrics::high_low(&forecast.data.slots, now)
    }
}

/// Everything shown for a location: its name plus conditions
#[derive(Debug)]
pub struct LocationReport {
    pub place: PlaceResult,
    pub conditions: Conditions,
}

#[derive(Debug, Clone)]
pub struct WeatherService {
    fetcher: CachedFetcher,
    connectivity: Arc<dyn ConnectivityOracle>,
    weather: WeatherClient,
    geocode: GeocodeClient,
    max_age: Duration,
    geocode_max_age: Duration,
}

impl WeatherService {
    pub fn new(
        fetcher: CachedFetcher,
        connectivity: Arc<dyn ConnectivityOracle>,
        weather: WeatherClient,
        geocode: GeocodeClient,
    ) -> Self {
        Self {
            fetcher,
            connectivity,
            weather,
            geocode,
            max_age: DEFAULT_MAX_AGE,
            geocode_max_age: DEFAULT_GEOCODE_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_geocode_max_age(mut self, max_age: Duration) -> Self {
        self.geocode_max_age = max_age;
        self
    }

    pub async fn current(&self, at: Coordinates) -> WeatherResult<CurrentWeather> {
        self.fetcher
            .fetch(&at.cache_key(CURRENT_ENDPOINT), self.max_age, || {
                self.weather.fetch_current(at)
            })
            .await
    }

    /// The forecast behind the hourly, weekly, precipitation and high/low views
    pub async fn forecast(&self, at: Coordinates) -> WeatherResult<Forecast> {
        self.fetcher
            .fetch(&at.cache_key(FORECAST_ENDPOINT), self.max_age, || {
                self.weather.fetch_forecast(at)
            })
            .await
    }

    pub async fn place(&self, at: Coordinates) -> PlaceResult {
        self.fetcher
            .fetch(&at.cache_key(GEOCODE_ENDPOINT), self.geocode_max_age, || {
                self.geocode.reverse(at)
            })
            .await
    }

    /// Current conditions and forecast, fetched concurrently
    pub async fn conditions(&self, at: Coordinates) -> Conditions {
        let (current, forecast) = futures::join!(self.current(at), self.forecast(at));
        Conditions {
            coordinates: at,
            current,
            forecast,
        }
    }

    /// Place name, current conditions and forecast, fetched concurrently
    pub async fn report(&self, at: Coordinates) -> LocationReport {
        let (place, conditions) = futures::join!(self.place(at), self.conditions(at));
        if let Err(e) = &place {
            tracing::warn!(error = %e, "place name unavailable");
        }
        LocationReport { place, conditions }
    }

    /// Looks up places by name; never cached
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, ServiceError> {
        if !self.connectivity.check().await.allows_network() {
            return Err(ServiceError::Offline);
        }
        Ok(self.geocode.search(query).await?)
    }

    /// Drops every cached response
    pub fn clear_cache(&self) -> Result<(), StoreError> {
        self.fetcher.invalidate_all()
    }
}
