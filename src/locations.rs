//! Saved locations
//!
//! The user's list of places, persisted as JSON in the data directory.
//! Mutations are written through immediately.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::write_atomic;
use crate::data::Place;

const LOCATIONS_FILE: &str = "locations.json";

/// Queries shorter than this match nothing
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("{0} is already saved")]
    AlreadySaved(String),

    #[error("No saved location named '{0}'")]
    NotFound(String),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Saved locations file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode saved locations: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct LocationBook {
    path: PathBuf,
    places: Vec<Place>,
}

impl LocationBook {
    /// Loads the book from `data_dir`, starting empty if no file exists yet
    ///
    /// A corrupt file is an error rather than an empty book so that the
    /// next save does not overwrite the user's list.
    pub fn load(data_dir: &Path) -> Result<Self, LocationError> {
        let path = data_dir.join(LOCATIONS_FILE);
        let places = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| LocationError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(LocationError::Io { path, source }),
        };

        Ok(Self { path, places })
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Whether a place at the same coordinates is already saved
    pub fn contains(&self, place: &Place) -> bool {
        self.places
            .iter()
            .any(|p| p.coordinates.same_place(&place.coordinates))
    }

    pub fn add(&mut self, place: Place) -> Result<(), LocationError> {
        if self.contains(&place) {
            return Err(LocationError::AlreadySaved(place.display_name()));
        }
        self.places.push(place);
        self.save()
    }

    /// Removes the first place whose name matches, ignoring case
    pub fn remove(&mut self, name: &str) -> Result<Place, LocationError> {
        let index = self
            .places
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| LocationError::NotFound(name.to_string()))?;
        let removed = self.places.remove(index);
        self.save()?;
        Ok(removed)
    }

    /// Exact name lookup, ignoring case
    pub fn find(&self, name: &str) -> Option<&Place> {
        self.places
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Places whose name contains `query`, ignoring case
    pub fn matching(&self, query: &str) -> Vec<&Place> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        self.places
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .collect()
    }

    fn save(&self) -> Result<(), LocationError> {
        let json = serde_json::to_vec_pretty(&self.places)?;
        write_atomic(&self.path, &json).map_err(|source| LocationError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
