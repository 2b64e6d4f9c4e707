//! Offline-aware fetch-through cache
//!
//! `CachedFetcher::fetch` decides per call whether to answer from the store
//! or from the network:
//!
//! - offline: serve the stored entry only while it is younger than `max_age`,
//!   otherwise fail with [`FetchError::CacheMiss`];
//! - online (or connectivity unknown): run the remote operation, persist its
//!   result, and on failure fall back to whatever is stored regardless of
//!   age. Only when nothing is stored does the call fail with
//!   [`FetchError::RemoteFetchFailed`].
//!
//! The asymmetry is intentional: old data is acceptable as a fallback for a
//! failed request, but not as the primary answer while offline.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{CacheEntry, CacheStore, Clock, StoreError, SystemClock};
use crate::connectivity::ConnectivityOracle;

/// Default freshness window for weather data
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Where a fetched value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// The remote operation succeeded during this call
    Network,
    /// A stored entry younger than `max_age`
    FreshCache,
    /// A stored entry at or past `max_age`, served because the network failed
    StaleCache,
}

/// A value together with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
    /// When the data was originally fetched from the network
    pub stored_at: DateTime<Utc>,
}

impl<T> Fetched<T> {
    pub fn is_from_cache(&self) -> bool {
        self.source != DataSource::Network
    }

    pub fn is_stale(&self) -> bool {
        self.source == DataSource::StaleCache
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            source: self.source,
            stored_at: self.stored_at,
        }
    }
}

/// Errors returned when no data can be produced
#[derive(Debug, Error)]
pub enum FetchError<E: std::error::Error + 'static> {
    /// Offline and no fresh entry is stored for the key
    #[error("no cached data for `{key}` while offline")]
    CacheMiss { key: String },

    /// Online, the remote operation failed, and nothing is stored to fall back on
    #[error("fetching `{key}` failed: {source}")]
    RemoteFetchFailed {
        key: String,
        #[source]
        source: E,
    },

    /// Keys identify resources and must not be empty
    #[error("cache key must not be empty")]
    EmptyKey,
}

/// Fetch-through cache shared by every remote resource
///
/// Cloning is cheap; clones share the store, oracle and clock.
#[derive(Debug, Clone)]
pub struct CachedFetcher {
    store: Arc<dyn CacheStore>,
    connectivity: Arc<dyn ConnectivityOracle>,
    clock: Arc<dyn Clock>,
}

impl CachedFetcher {
    pub fn new(store: Arc<dyn CacheStore>, connectivity: Arc<dyn ConnectivityOracle>) -> Self {
        Self {
            store,
            connectivity,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the system clock, e.g. with a [`ManualClock`](super::ManualClock) in tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns data for `key` from the store or from `remote`
    ///
    /// Suspends at most twice: once for the connectivity check and, on the
    /// online path, once for `remote`. The store is written only after
    /// `remote` succeeds, so dropping the returned future never leaves a
    /// partial entry behind.
    pub async fn fetch<T, E, F, Fut>(
        &self,
        key: &str,
        max_age: Duration,
        remote: F,
    ) -> Result<Fetched<T>, FetchError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if key.is_empty() {
            return Err(FetchError::EmptyKey);
        }

        let connectivity = self.connectivity.check().await;

        if !connectivity.allows_network() {
            let now = self.clock.now();
            return match self.lookup::<T>(key) {
                Some((entry, data)) if entry.is_fresh(now, max_age) => {
                    tracing::debug!(key, "offline, serving fresh cache entry");
                    Ok(Fetched {
                        data,
                        source: DataSource::FreshCache,
                        stored_at: entry.stored_at,
                    })
                }
                Some((entry, _)) => {
                    tracing::debug!(
                        key,
                        age_secs = entry.age(now).as_secs(),
                        "offline, cached entry too old to serve"
                    );
                    Err(FetchError::CacheMiss { key: key.to_string() })
                }
                None => Err(FetchError::CacheMiss { key: key.to_string() }),
            };
        }

        match remote().await {
            Ok(data) => {
                let stored_at = self.clock.now();
                self.persist(key, &data, stored_at);
                Ok(Fetched {
                    data,
                    source: DataSource::Network,
                    stored_at,
                })
            }
            Err(source) => match self.lookup::<T>(key) {
                Some((entry, data)) => {
                    let fresh = entry.is_fresh(self.clock.now(), max_age);
                    tracing::warn!(
                        key,
                        error = %source,
                        "remote fetch failed, serving cached data"
                    );
                    Ok(Fetched {
                        data,
                        source: if fresh {
                            DataSource::FreshCache
                        } else {
                            DataSource::StaleCache
                        },
                        stored_at: entry.stored_at,
                    })
                }
                None => Err(FetchError::RemoteFetchFailed {
                    key: key.to_string(),
                    source,
                }),
            },
        }
    }

    /// Removes every stored entry
    pub fn invalidate_all(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        tracing::info!("cache cleared");
        Ok(())
    }

    /// Reads and decodes the entry for `key`
    ///
    /// Unreadable or undecodable entries count as absent.
    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<(CacheEntry, T)> {
        let entry = match self.store.get(key) {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable cache entry");
                return None;
            }
        };

        match serde_json::from_value::<T>(entry.payload.clone()) {
            Ok(data) => Some((entry, data)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring cache entry with unexpected shape");
                None
            }
        }
    }

    /// Writes a fresh entry; failures are logged, the caller still gets its data
    fn persist<T: Serialize>(&self, key: &str, data: &T, stored_at: DateTime<Utc>) {
        let payload = match serde_json::to_value(data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key, error = %e, "payload not cacheable");
                return;
            }
        };

        if let Err(e) = self.store.set(&CacheEntry::new(key, payload, stored_at)) {
            tracing::warn!(key, error = %e, "failed to persist cache entry");
        }
    }
}
