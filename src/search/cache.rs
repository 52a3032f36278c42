//! Time-bounded search result cache.
//!
//! Entries are keyed by `"{query}_{max_results}"` and live for a fixed TTL.
//! Expired entries are evicted lazily on lookup. The map is unbounded.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::core::SearchResult;

/// A cached search response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Results in provider order.
    pub results: Vec<SearchResult>,
    /// Insertion time.
    pub timestamp: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) < ttl
    }
}

/// Builds the cache key for a query and result limit.
#[must_use]
pub fn cache_key(query: &str, max_results: usize) -> String {
    format!("{query}_{max_results}")
}

/// Mutex-guarded TTL cache for search results.
///
/// The lock is only held for map operations and never across an await point.
#[derive(Debug)]
pub struct SearchCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl SearchCache {
    /// Creates an empty cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Entry time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns cached results if present and younger than the TTL.
    ///
    /// An expired entry is removed and reported as a miss.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<SearchResult>> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl, now) => {
                debug!(key, "search cache hit");
                Some(entry.results.clone())
            }
            Some(_) => {
                entries.remove(key);
                debug!(key, "search cache entry expired");
                None
            }
            None => {
                debug!(key, "search cache miss");
                None
            }
        }
    }

    /// Stores results under `key`, replacing any previous entry.
    pub fn insert(&self, key: String, results: Vec<SearchResult>) {
        let entry = CacheEntry {
            results,
            timestamp: Instant::now(),
        };
        self.lock().insert(key, entry);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
