//! Command-line interface parsing for skywatch
//!
//! This module handles parsing of CLI arguments using clap and turns the
//! location arguments of `show` into a [`LocationTarget`].

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::{CoordinateError, Coordinates};
use crate::settings::TemperatureUnit;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified temperature unit is not recognized
    #[error("Invalid temperature unit: '{0}'. Valid units: celsius, fahrenheit")]
    InvalidUnit(String),

    /// `show` was given neither a saved location nor coordinates
    #[error("No location given. Pass a saved location name or --lat and --lon")]
    MissingLocation,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(#[from] CoordinateError),
}

/// skywatch - current weather and forecasts, with an offline cache
#[derive(Parser, Debug)]
#[command(name = "skywatch")]
#[command(about = "Current weather and forecasts, with an offline cache")]
#[command(version)]
pub struct Cli {
    /// Never touch the network; serve only fresh cached data
    #[arg(long, global = true)]
    pub offline: bool,

    /// Seconds before cached weather is considered stale (default 600)
    #[arg(long, value_name = "SECS", global = true)]
    pub max_age: Option<u64>,

    /// Directory for cached API responses
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Directory for settings and saved locations
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log cache and network decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show current conditions, hourly and weekly forecast for a location
    Show(LocationArgs),

    /// Search places by name (saved locations first)
    Search {
        /// Place name, at least two characters
        query: String,
    },

    /// Manage saved locations
    Locations {
        #[command(subcommand)]
        action: LocationsAction,
    },

    /// Show or change display settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct LocationArgs {
    /// Name of a saved location
    #[arg(conflicts_with_all = ["lat", "lon"])]
    pub name: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum LocationsAction {
    /// List saved locations with current temperature and high/low
    List,
    /// Search for a place and save the first match not already saved
    Add { query: String },
    /// Remove a saved location by name
    Remove { name: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Set the temperature unit
    Unit {
        #[arg(value_parser = parse_unit_arg)]
        unit: TemperatureUnit,
    },
    /// Turn the dark palette on or off
    DarkMode { state: Toggle },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> bool {
        toggle == Toggle::On
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CacheAction {
    /// Delete every cached response
    Clear,
}

/// Where `show` should look
#[derive(Debug, Clone, PartialEq)]
pub enum LocationTarget {
    Coordinates(Coordinates),
    Saved(String),
}

impl LocationTarget {
    pub fn from_args(args: &LocationArgs) -> Result<Self, CliError> {
        match (&args.name, args.lat, args.lon) {
            (Some(name), _, _) => Ok(LocationTarget::Saved(name.clone())),
            (None, Some(lat), Some(lon)) => {
                Ok(LocationTarget::Coordinates(Coordinates::new(lat, lon)?))
            }
            _ => Err(CliError::MissingLocation),
        }
    }
}

/// Parses a temperature unit argument.
pub fn parse_unit_arg(s: &str) -> Result<TemperatureUnit, CliError> {
    s.parse().map_err(|_| CliError::InvalidUnit(s.to_string()))
}
