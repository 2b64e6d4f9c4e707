//! Persistent key-value stores for cache entries
//!
//! `FileStore` keeps one JSON file per key in the `entries/` subdirectory
//! of an XDG-compliant cache directory (`~/.cache/skywatch/entries/` on
//! Linux). Nothing outside that subdirectory is ever written or removed,
//! so the cache may share a directory with other files. Every write goes to a temp
//! file in the same directory which is then renamed over the target, so a
//! reader sees either the previous entry or the new one, never a torn file.

use directories::ProjectDirs;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::CacheEntry;

/// Subdirectory of the cache dir that holds entry files
const ENTRIES_DIR: &str = "entries";

/// Errors raised by a cache store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("cache I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored entry could not be decoded
    #[error("cache entry {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An entry could not be encoded
    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable storage consumed by the cached fetcher
///
/// Implementations must make `set` atomic per entry and must make `clear`
/// visible to every lookup that starts after it returns.
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Returns the entry stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Stores `entry` under `entry.key`, replacing any previous entry
    fn set(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Removes every entry
    fn clear(&self) -> Result<(), StoreError>;
}

/// Cache store backed by one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore in the XDG cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g. no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "skywatch")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entries_dir(&self) -> PathBuf {
        self.cache_dir.join(ENTRIES_DIR)
    }

    /// Returns the path to the cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.entries_dir().join(format!("{}.json", file_stem(key)))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let path = self.cache_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let entry: CacheEntry = serde_json::from_str(&content)
            .map_err(|source| StoreError::Corrupt { path, source })?;

        // Case-insensitive filesystems can map two keys onto one file
        if entry.key != key {
            tracing::debug!(key, stored_key = %entry.key, "cache file belongs to another key");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn set(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entry)?;
        let path = self.cache_path(&entry.key);
        write_atomic(&path, &json).map_err(|source| StoreError::Io { path, source })
    }

    fn clear(&self) -> Result<(), StoreError> {
        let dir = self.entries_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        for entry in entries {
            let path = entry
                .map_err(|source| StoreError::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Err(StoreError::Io { path, source }),
                }
            }
        }

        Ok(())
    }
}

/// Maps a cache key to a filename stem without collisions
///
/// ASCII alphanumerics and `.`, `_`, `-` pass through; every other byte
/// becomes `%XX`. A leading `.` is escaped too so no entry is hidden.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for (i, byte) in key.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && i > 0);
        if keep {
            stem.push(byte as char);
        } else {
            let _ = write!(stem, "%{:02X}", byte);
        }
    }
    stem
}

/// Writes `bytes` to `path` through a temp file and a rename
///
/// Creates the parent directory when it is missing.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Coordinates, Place};
    use crate::locations::LocationBook;
    use crate::settings::{Settings, SettingsStore, TemperatureUnit};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    fn entry(key: &str, temp: i64) -> CacheEntry {
        CacheEntry::new(key, json!({ "temp": temp }), Utc::now())
    }

    #[test]
    fn test_set_creates_file_in_cache_directory() {
        let (store, temp_dir) = create_test_store();

        store.set(&entry("weather_10.0_20.0", 30)).expect("Write should succeed");

        let expected_path = temp_dir.path().join("entries").join("weather_10.0_20.0.json");
        assert!(expected_path.exists(), "Cache file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"stored_at\""));
        assert!(content.contains("\"temp\""));
        assert!(content.contains("30"));
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result = store.get("nonexistent_key").expect("Missing key is not an error");

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[test]
    fn test_get_returns_stored_entry() {
        let (store, _temp_dir) = create_test_store();
        let written = entry("forecast_1.0_2.0", 12);

        store.set(&written).expect("Write should succeed");
        let read = store.get("forecast_1.0_2.0").expect("Read should succeed");

        assert_eq!(read, Some(written));
    }

    #[test]
    fn test_overwrite_existing_entry() {
        let (store, _temp_dir) = create_test_store();

        store.set(&entry("overwrite_key", 1)).expect("First write should succeed");
        store.set(&entry("overwrite_key", 2)).expect("Second write should succeed");

        let read = store.get("overwrite_key").unwrap().expect("Entry should exist");
        assert_eq!(read.payload, json!({ "temp": 2 }));
    }

    #[test]
    fn test_set_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let store = FileStore::with_dir(nested_path.clone());

        store.set(&entry("nested_key", 1)).expect("Write should succeed");

        assert!(
            nested_path.join("entries").join("nested_key.json").exists(),
            "Cache file should exist"
        );
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let (store, temp_dir) = create_test_store();
        fs::create_dir_all(temp_dir.path().join("entries")).unwrap();
        fs::write(temp_dir.path().join("entries").join("broken.json"), "{ not json").unwrap();

        let result = store.get("broken");

        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_clear_removes_every_entry() {
        let (store, temp_dir) = create_test_store();
        store.set(&entry("a", 1)).unwrap();
        store.set(&entry("b", 2)).unwrap();
        fs::write(temp_dir.path().join("notes.json"), "{}").unwrap();

        store.clear().expect("Clear should succeed");

        assert!(store.get("a").unwrap().is_none());
        assert!(store.get("b").unwrap().is_none());
        assert!(
            temp_dir.path().join("notes.json").exists(),
            "Files outside entries/ are left alone"
        );
    }

    #[test]
    fn test_clear_keeps_user_data_in_shared_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut book = LocationBook::load(temp_dir.path()).unwrap();
        book.add(Place {
            name: "Vancouver".to_string(),
            country: "CA".to_string(),
            coordinates: Coordinates::new(49.28, -123.12).unwrap(),
        })
        .unwrap();
        let settings = SettingsStore::in_dir(temp_dir.path());
        let saved = Settings {
            dark_mode: true,
            temperature_unit: TemperatureUnit::Fahrenheit,
        };
        settings.save(&saved).unwrap();

        let store = FileStore::with_dir(temp_dir.path().to_path_buf());
        store.set(&entry("settings", 1)).unwrap();
        store.set(&entry("locations", 2)).unwrap();
        store.clear().unwrap();

        assert_eq!(LocationBook::load(temp_dir.path()).unwrap().places().len(), 1);
        assert_eq!(settings.load(), saved);
    }

    #[test]
    fn test_get_ignores_file_of_another_key() {
        let (store, temp_dir) = create_test_store();
        let entries = temp_dir.path().join("entries");
        fs::create_dir_all(&entries).unwrap();
        // What a case-insensitive filesystem shows for "weather_A" after "weather_a" was written
        let json = serde_json::to_string(&entry("weather_a", 1)).unwrap();
        fs::write(entries.join("weather_A.json"), json).unwrap();

        assert!(store.get("weather_A").unwrap().is_none());
    }

    #[test]
    fn test_clear_on_missing_directory_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::with_dir(temp_dir.path().join("never-created"));

        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_file_stem_escapes_unsafe_bytes() {
        assert_eq!(file_stem("weather_10.0_-20.0"), "weather_10.0_-20.0");
        assert_eq!(file_stem("a/b"), "a%2Fb");
        assert_eq!(file_stem("a b"), "a%20b");
        assert_eq!(file_stem(".hidden"), "%2Ehidden");
        assert_ne!(file_stem("a/b"), file_stem("a_b"));
    }

    #[test]
    fn test_keys_with_slashes_stay_inside_cache_dir() {
        let (store, temp_dir) = create_test_store();

        store.set(&entry("../escape", 1)).unwrap();

        assert!(temp_dir.path().join("entries").join("%2E.%2Fescape.json").exists());
        assert!(store.get("../escape").unwrap().is_some());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = FileStore::new() {
            let path_str = store.dir().to_string_lossy();
            assert!(path_str.contains("skywatch"), "Cache path should contain project name");
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
