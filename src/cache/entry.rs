//! Cache entry type shared by every store implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A snapshot of one remote response, stamped with the time it was fetched
///
/// Entries are immutable: a newer fetch for the same key replaces the whole
/// entry rather than updating it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resource identity, e.g. `weather_49.3_-123.1`
    pub key: String,
    /// The decoded remote response
    pub payload: serde_json::Value,
    /// When the payload was fetched
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        payload: serde_json::Value,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            payload,
            stored_at,
        }
    }

    /// How old the entry is at `now`
    ///
    /// An entry stamped in the future (the wall clock moved backwards) has
    /// an age of zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Returns true while `now - stored_at < max_age`
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) < max_age
    }
}
