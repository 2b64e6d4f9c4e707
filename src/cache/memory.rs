//! In-process cache store
//!
//! Not durable; used for tests and for runs where no cache directory can be
//! determined.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::{CacheEntry, CacheStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.entries.write().insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_set_get_and_clear() {
        let store = MemoryStore::new();
        let entry = CacheEntry::new("k", json!([1, 2, 3]), Utc::now());

        store.set(&entry).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(entry));
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.is_empty());
    }
}
