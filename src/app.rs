//! Application wiring and command dispatch
//!
//! [`App`] owns the weather service and the on-disk user data, and runs one
//! parsed [`Command`] at a time, writing rendered output to any
//! [`Write`](std::io::Write) sink.

use chrono::{Local, Utc};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheStore, CachedFetcher, FileStore, MemoryStore, StoreError};
use crate::cli::{
    CacheAction, CliError, Command, LocationArgs, LocationTarget, LocationsAction, SettingsAction,
};
use crate::config::AppConfig;
use crate::connectivity::{Connectivity, ConnectivityOracle, FixedConnectivity, TcpCheck};
use crate::data::{Coordinates, GeocodeClient, GeocodeError, Place, WeatherClient, WeatherError};
use crate::locations::{LocationBook, LocationError, MIN_QUERY_LEN};
use crate::service::{ServiceError, WeatherService};
use crate::settings::{Settings, SettingsError, SettingsStore};
use crate::ui::{self, Palette, SearchOutcome};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Cache(#[from] StoreError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to set up weather client: {0}")]
    Weather(#[from] WeatherError),

    #[error("Failed to set up geocoding client: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Search query must be at least 2 characters")]
    QueryTooShort,

    #[error("No locations found for '{0}'")]
    NoMatch(String),

    #[error("No weather data available")]
    NoData,

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

pub struct App {
    service: WeatherService,
    settings: SettingsStore,
    data_dir: PathBuf,
    color: bool,
}

impl App {
    /// Builds the service stack described by `config`
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let store: Arc<dyn CacheStore> = match &config.cache_dir {
            Some(dir) => Arc::new(FileStore::with_dir(dir.clone())),
            None => {
                tracing::warn!("no cache directory available, responses will not persist");
                Arc::new(MemoryStore::new())
            }
        };

        let connectivity: Arc<dyn ConnectivityOracle> = if config.offline {
            Arc::new(FixedConnectivity(Connectivity::Offline))
        } else {
            Arc::new(TcpCheck::new(config.check_addr.clone(), config.check_timeout))
        };

        let weather = WeatherClient::new(config.weather_base_url.clone(), config.api_key.clone())?;
        let geocode = GeocodeClient::new(
            config.nominatim_url.clone(),
            config.weather_base_url.clone(),
            config.api_key.clone(),
        )?;

        let fetcher = CachedFetcher::new(store, connectivity.clone());
        let service = WeatherService::new(fetcher, connectivity, weather, geocode)
            .with_max_age(config.max_age)
            .with_geocode_max_age(config.geocode_max_age);

        Ok(Self::with_service(service, &config.data_dir).with_color(io::stdout().is_terminal()))
    }

    /// Wraps an already configured service; output is uncolored
    pub fn with_service(service: WeatherService, data_dir: &Path) -> Self {
        Self {
            service,
            settings: SettingsStore::in_dir(data_dir),
            data_dir: data_dir.to_path_buf(),
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub async fn run(&self, command: Command, out: &mut dyn Write) -> Result<(), AppError> {
        let settings = self.settings.load();
        let palette = if self.color {
            Palette::themed(settings.dark_mode)
        } else {
            Palette::plain()
        };

        match command {
            Command::Show(args) => self.show(&args, &settings, &palette, out).await,
            Command::Search { query } => {
                let outcome = self.search(&query).await?;
                writeln!(out, "{}", ui::render_search(&outcome, &palette))?;
                Ok(())
            }
            Command::Locations { action } => match action {
                LocationsAction::List => self.list_locations(&settings, &palette, out).await,
                LocationsAction::Add { query } => {
                    let place = self.add_location(&query).await?;
                    writeln!(out, "Saved {}", place.display_name())?;
                    Ok(())
                }
                LocationsAction::Remove { name } => {
                    let removed = LocationBook::load(&self.data_dir)?.remove(&name)?;
                    writeln!(out, "Removed {}", removed.display_name())?;
                    Ok(())
                }
            },
            Command::Settings { action } => self.settings(action, settings, out),
            Command::Cache {
                action: CacheAction::Clear,
            } => {
                self.service.clear_cache()?;
                writeln!(out, "Cache cleared")?;
                Ok(())
            }
        }
    }

    async fn show(
        &self,
        args: &LocationArgs,
        settings: &Settings,
        palette: &Palette,
        out: &mut dyn Write,
    ) -> Result<(), AppError> {
        let at = self.resolve(LocationTarget::from_args(args)?)?;
        let report = self.service.report(at).await;

        writeln!(
            out,
            "{}",
            ui::render_report(&report, settings, palette, Utc::now(), &Local)
        )?;

        if report.conditions.is_empty() {
            return Err(AppError::NoData);
        }
        Ok(())
    }

    fn resolve(&self, target: LocationTarget) -> Result<Coordinates, AppError> {
        match target {
            LocationTarget::Coordinates(at) => Ok(at),
            LocationTarget::Saved(name) => {
                let book = LocationBook::load(&self.data_dir)?;
                let place = book.find(&name).ok_or(LocationError::NotFound(name))?;
                Ok(place.coordinates)
            }
        }
    }

    /// Saved locations first; the geocoder is only asked when none match
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, AppError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Err(AppError::QueryTooShort);
        }

        let book = LocationBook::load(&self.data_dir)?;
        let saved = book.matching(query);
        if !saved.is_empty() {
            return Ok(SearchOutcome::Saved(saved.into_iter().cloned().collect()));
        }

        let found = self.service.search(query).await?;
        if found.is_empty() {
            return Ok(SearchOutcome::NoneFound);
        }

        let new: Vec<Place> = dedup(found).into_iter().filter(|p| !book.contains(p)).collect();
        Ok(if new.is_empty() {
            SearchOutcome::AllSaved
        } else {
            SearchOutcome::Found(new)
        })
    }

    /// Geocodes `query` and saves the first result not already saved
    pub async fn add_location(&self, query: &str) -> Result<Place, AppError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Err(AppError::QueryTooShort);
        }

        let mut book = LocationBook::load(&self.data_dir)?;
        let found = self.service.search(query).await?;
        let Some(first) = found.first().cloned() else {
            return Err(AppError::NoMatch(query.to_string()));
        };

        match found.into_iter().find(|p| !book.contains(p)) {
            Some(place) => {
                book.add(place.clone())?;
                tracing::info!(name = %place.name, "location saved");
                Ok(place)
            }
            None => Err(LocationError::AlreadySaved(first.display_name()).into()),
        }
    }

    async fn list_locations(
        &self,
        settings: &Settings,
        palette: &Palette,
        out: &mut dyn Write,
    ) -> Result<(), AppError> {
        let book = LocationBook::load(&self.data_dir)?;

        let conditions = futures::future::join_all(
            book.places()
                .iter()
                .map(|place| self.service.conditions(place.coordinates)),
        )
        .await;
        let entries: Vec<_> = book.places().iter().cloned().zip(conditions).collect();

        writeln!(out, "{}", ui::render_locations(&entries, settings, palette, Utc::now()))?;
        Ok(())
    }

    fn settings(
        &self,
        action: Option<SettingsAction>,
        mut settings: Settings,
        out: &mut dyn Write,
    ) -> Result<(), AppError> {
        match action {
            None | Some(SettingsAction::Show) => {}
            Some(SettingsAction::Unit { unit }) => {
                settings.temperature_unit = unit;
                self.settings.save(&settings)?;
            }
            Some(SettingsAction::DarkMode { state }) => {
                settings.dark_mode = state.into();
                self.settings.save(&settings)?;
            }
        }
        writeln!(out, "{}", ui::render_settings(&settings))?;
        Ok(())
    }
}

/// Drops later results at the same coordinates as an earlier one
fn dedup(places: Vec<Place>) -> Vec<Place> {
    let mut unique: Vec<Place> = Vec::with_capacity(places.len());
    for place in places {
        if !unique.iter().any(|p| p.coordinates.same_place(&place.coordinates)) {
            unique.push(place);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Toggle;
    use crate::settings::TemperatureUnit;
    use tempfile::TempDir;

    fn offline_app(data_dir: &Path) -> App {
        let connectivity: Arc<dyn ConnectivityOracle> =
            Arc::new(FixedConnectivity(Connectivity::Offline));
        let fetcher = CachedFetcher::new(Arc::new(MemoryStore::new()), connectivity.clone());
        let weather = WeatherClient::new("http://127.0.0.1:9", Some("key".to_string())).unwrap();
        let geocode = GeocodeClient::new("http://127.0.0.1:9", "http://127.0.0.1:9", None).unwrap();
        App::with_service(WeatherService::new(fetcher, connectivity, weather, geocode), data_dir)
    }

    fn place(name: &str, lat: f64, lon: f64) -> Place {
        Place {
            name: name.to_string(),
            country: "CA".to_string(),
            coordinates: Coordinates::new(lat, lon).unwrap(),
        }
    }

    async fn run(app: &App, command: Command) -> (Result<(), AppError>, String) {
        let mut out = Vec::new();
        let result = app.run(command, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_show_offline_without_cache() {
        let temp_dir = TempDir::new().unwrap();
        let app = offline_app(temp_dir.path());

        let (result, output) = run(
            &app,
            Command::Show(LocationArgs {
                name: None,
                lat: Some(10.0),
                lon: Some(20.0),
            }),
        )
        .await;

        assert!(matches!(result, Err(AppError::NoData)));
        assert!(output.contains("Location unavailable"));
        assert!(output.contains("No data available offline. Try again when online."));
    }

    #[tokio::test]
    async fn test_show_unknown_saved_name() {
        let temp_dir = TempDir::new().unwrap();
        let app = offline_app(temp_dir.path());

        let (result, _) = run(
            &app,
            Command::Show(LocationArgs {
                name: Some("Atlantis".to_string()),
                lat: None,
                lon: None,
            }),
        )
        .await;

        assert!(matches!(
            result,
            Err(AppError::Location(LocationError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_search_prefers_saved_locations() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = LocationBook::load(temp_dir.path()).unwrap();
        book.add(place("Vancouver", 49.28, -123.12)).unwrap();
        let app = offline_app(temp_dir.path());

        let outcome = app.search("vanc").await.unwrap();

        assert_eq!(
            outcome,
            SearchOutcome::Saved(vec![place("Vancouver", 49.28, -123.12)])
        );
    }

    #[tokio::test]
    async fn test_search_offline_without_local_match() {
        let temp_dir = TempDir::new().unwrap();
        let app = offline_app(temp_dir.path());

        let result = app.search("Paris").await;

        match result {
            Err(AppError::Service(e @ ServiceError::Offline)) => {
                assert_eq!(e.to_string(), "Cannot search while offline");
            }
            other => panic!("expected offline error, got {:?}", other),
        }
        assert!(matches!(app.search(" p ").await, Err(AppError::QueryTooShort)));
    }

    #[tokio::test]
    async fn test_settings_persist_between_runs() {
        let temp_dir = TempDir::new().unwrap();
        let app = offline_app(temp_dir.path());

        run(
            &app,
            Command::Settings {
                action: Some(SettingsAction::Unit {
                    unit: TemperatureUnit::Fahrenheit,
                }),
            },
        )
        .await
        .0
        .unwrap();
        run(
            &app,
            Command::Settings {
                action: Some(SettingsAction::DarkMode { state: Toggle::On }),
            },
        )
        .await
        .0
        .unwrap();

        let (result, output) = run(&app, Command::Settings { action: None }).await;

        assert!(result.is_ok());
        assert_eq!(output, "Temperature unit: fahrenheit\nDark mode: on\n");
    }

    #[tokio::test]
    async fn test_list_and_remove_locations() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = LocationBook::load(temp_dir.path()).unwrap();
        book.add(place("Home", 1.0, 2.0)).unwrap();
        let app = offline_app(temp_dir.path());

        let (_, listed) = run(
            &app,
            Command::Locations {
                action: LocationsAction::List,
            },
        )
        .await;
        assert_eq!(listed, "Home, CA  --  no data\n");

        let (result, removed) = run(
            &app,
            Command::Locations {
                action: LocationsAction::Remove {
                    name: "home".to_string(),
                },
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(removed, "Removed Home, CA\n");
        assert!(LocationBook::load(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_of_each_position() {
        let places = vec![
            place("Springfield", 39.8, -89.6),
            place("Springfield (IL)", 39.8, -89.6),
            place("Springfield", 37.2, -93.3),
        ];

        let unique = dedup(places);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name, "Springfield");
        assert_eq!(unique[1].coordinates.latitude, 37.2);
    }
}
