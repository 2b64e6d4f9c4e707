//! Geocoding: coordinates to place names and back
//!
//! Reverse lookups use Nominatim (OpenStreetMap), which needs no key but
//! does require a User-Agent. Forward search uses OpenWeatherMap's direct
//! geocoding endpoint and the same key as the weather calls.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::{Coordinates, Place};

/// Base URL for Nominatim
pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("skywatch/", env!("CARGO_PKG_VERSION"));

/// Maximum number of results requested from a forward search
pub const SEARCH_LIMIT: u8 = 5;

/// Errors that can occur during geocoding
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No OpenWeatherMap API key configured (set OPENWEATHER_API_KEY)")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Geocoding API returned status {0}")]
    Status(u16),

    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The position has no address (open sea, poles)
    #[error("No address found for this position")]
    NoAddress,
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    nominatim_url: String,
    openweather_url: String,
    api_key: Option<String>,
}

impl GeocodeClient {
    pub fn new(
        nominatim_url: impl Into<String>,
        openweather_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            nominatim_url: nominatim_url.into().trim_end_matches('/').to_string(),
            openweather_url: openweather_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Resolves coordinates to the nearest city, town or village
    ///
    /// The place name falls back to "Unknown" when the address has none of
    /// those parts.
    pub async fn reverse(&self, at: Coordinates) -> Result<Place, GeocodeError> {
        let url = format!("{}/reverse", self.nominatim_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let text = response.text().await?;
        let body: NominatimResponse = serde_json::from_str(&text)?;
        let address = body.address.ok_or(GeocodeError::NoAddress)?;

        let name = address
            .city
            .or(address.town)
            .or(address.village)
            .unwrap_or_else(|| "Unknown".to_string());

        tracing::debug!(%name, "reverse geocoded");
        Ok(Place {
            name,
            country: address.country.unwrap_or_default(),
            coordinates: at,
        })
    }

    /// Searches places by name, best match first
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::MissingApiKey)?;
        let url = format!("{}/geo/1.0/direct", self.openweather_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let text = response.text().await?;
        let results: Vec<DirectResult> = serde_json::from_str(&text)?;

        Ok(results
            .into_iter()
            .filter_map(|r| {
                // Skip entries with coordinates we would reject later anyway
                let coordinates = Coordinates::new(r.lat, r.lon).ok()?;
                Some(Place {
                    name: r.name,
                    country: r.country.unwrap_or_default(),
                    coordinates,
                })
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

/// Entry of the direct geocoding response
#[derive(Debug, Deserialize)]
struct DirectResult {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
}
