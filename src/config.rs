//! Runtime configuration
//!
//! Built once at startup from CLI flags and environment variables; every
//! value has a default so skywatch runs (offline, from cache) without any
//! setup.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_MAX_AGE;
use crate::cli::Cli;
use crate::data::geocode::NOMINATIM_BASE_URL;
use crate::data::weather::OPENWEATHER_BASE_URL;
use crate::service::DEFAULT_GEOCODE_MAX_AGE;

pub const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";
pub const WEATHER_URL_VAR: &str = "SKYWATCH_WEATHER_URL";
pub const NOMINATIM_URL_VAR: &str = "SKYWATCH_NOMINATIM_URL";
pub const CHECK_ADDR_VAR: &str = "SKYWATCH_CHECK_ADDR";

/// Address dialed to decide whether the network is reachable
pub const DEFAULT_CHECK_ADDR: &str = "1.1.1.1:443";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OpenWeatherMap API key; requests fail without one, cached data still works
    pub api_key: Option<String>,
    pub weather_base_url: String,
    pub nominatim_url: String,
    /// Freshness window for weather and forecast data
    pub max_age: Duration,
    /// Freshness window for place names
    pub geocode_max_age: Duration,
    pub check_addr: String,
    pub check_timeout: Duration,
    /// Skip the connectivity check and behave as offline
    pub offline: bool,
    /// `None` when no cache directory can be determined; responses are then kept in memory
    pub cache_dir: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let dirs = ProjectDirs::from("", "", "skywatch");
        Self {
            api_key: None,
            weather_base_url: OPENWEATHER_BASE_URL.to_string(),
            nominatim_url: NOMINATIM_BASE_URL.to_string(),
            max_age: DEFAULT_MAX_AGE,
            geocode_max_age: DEFAULT_GEOCODE_MAX_AGE,
            check_addr: DEFAULT_CHECK_ADDR.to_string(),
            check_timeout: Duration::from_secs(2),
            offline: false,
            cache_dir: dirs.as_ref().map(|d| d.cache_dir().to_path_buf()),
            data_dir: dirs
                .as_ref()
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".skywatch")),
            verbose: false,
        }
    }
}

impl AppConfig {
    /// Builds the configuration from parsed CLI arguments and the process environment
    pub fn from_cli(cli: &Cli) -> Self {
        Self::from_cli_with_env(cli, |name| std::env::var(name).ok())
    }

    /// Like [`from_cli`](Self::from_cli) with an explicit environment lookup
    pub fn from_cli_with_env(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        config.api_key = env(API_KEY_VAR);
        if let Some(url) = env(WEATHER_URL_VAR) {
            config.weather_base_url = url;
        }
        if let Some(url) = env(NOMINATIM_URL_VAR) {
            config.nominatim_url = url;
        }
        if let Some(addr) = env(CHECK_ADDR_VAR) {
            config.check_addr = addr;
        }

        if let Some(secs) = cli.max_age {
            config.max_age = Duration::from_secs(secs);
        }
        if let Some(dir) = &cli.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }
        config.offline = cli.offline;
        config.verbose = cli.verbose;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.max_age, Duration::from_secs(600));
        assert_eq!(config.geocode_max_age, Duration::from_secs(86_400));
        assert_eq!(config.weather_base_url, "https://api.openweathermap.org");
        assert!(config.api_key.is_none());
        assert!(!config.offline);
    }

    #[test]
    fn test_config_from_cli_and_env() {
        let cli = Cli::parse_from([
            "skywatch",
            "--offline",
            "--max-age",
            "30",
            "--cache-dir",
            "/tmp/sw-cache",
            "--data-dir",
            "/tmp/sw-data",
            "cache",
            "clear",
        ]);
        let env: HashMap<&str, &str> = [
            (API_KEY_VAR, "secret"),
            (WEATHER_URL_VAR, "http://localhost:8080"),
            (CHECK_ADDR_VAR, "   "),
        ]
        .into_iter()
        .collect();

        let config =
            AppConfig::from_cli_with_env(&cli, |name| env.get(name).map(|v| v.to_string()));

        assert!(config.offline);
        assert_eq!(config.max_age, Duration::from_secs(30));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/sw-cache")));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/sw-data"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.weather_base_url, "http://localhost:8080");
        // Blank values are ignored
        assert_eq!(config.check_addr, DEFAULT_CHECK_ADDR);
    }
}
