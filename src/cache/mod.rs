//! Cache module for storing API responses
//!
//! Remote responses are persisted as timestamped entries so they can be shown
//! again when the network is unavailable. [`CachedFetcher`] decides per call
//! whether to serve from the store or from the network; the stores only hold
//! entries and never judge freshness themselves.

mod clock;
mod entry;
mod fetcher;
mod memory;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use fetcher::{CachedFetcher, DataSource, FetchError, Fetched, DEFAULT_MAX_AGE};
pub use memory::MemoryStore;
pub(crate) use store::write_atomic;
pub use store::{CacheStore, FileStore, StoreError};
