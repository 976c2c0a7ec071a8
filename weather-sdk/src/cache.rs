//! Bounded, expiring, least-recently-used cache of weather records keyed by city.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::{info, warn};

use crate::model::WeatherRecord;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: WeatherRecord,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, expiration: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) > expiration
    }
}

/// Per-instance weather cache.
///
/// Reads and writes both promote an entry to most-recently-used. Only writes
/// evict: after an insert, the least-recently-used entries are dropped until
/// at most `max_cities` remain. Expired entries are invisible to [`get`](Self::get)
/// but are left in place until overwritten or evicted.
#[derive(Debug)]
pub struct WeatherCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    max_cities: usize,
    expiration: Duration,
}

impl WeatherCache {
    pub fn new(max_cities: usize, expiration: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            max_cities,
            expiration,
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, city: &str) -> Option<WeatherRecord> {
        let now = Instant::now();
        let mut entries = self.entries();

        if entries.peek(city)?.is_expired(now, self.expiration) {
            warn!(city = %city, "Cache entry has expired");
            return None;
        }

        entries.get(city).map(|entry| entry.record.clone())
    }

    pub fn put(&self, city: &str, record: WeatherRecord) {
        info!(city = %city, "Caching weather data");

        let mut entries = self.entries();
        entries.put(
            city.to_owned(),
            CacheEntry { record, fetched_at: Instant::now() },
        );

        while entries.len() > self.max_cities {
            match entries.pop_lru() {
                Some((evicted, _)) => info!(city = %evicted, "Removing oldest cache entry"),
                None => break,
            }
        }
    }

    /// Snapshot of cached city names, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.entries().iter().map(|(city, _)| city.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_cities(&self) -> usize {
        self.max_cities
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }
}
