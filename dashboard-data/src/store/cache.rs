use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use meter_client::domain::MeterReading;

type CacheKey = (Option<String>, usize);

struct Entry {
    readings: Vec<MeterReading>,
    inserted_at: Instant,
}

/// Short-lived result cache keyed by `(source_filter, limit)`.
///
/// Bounds load under repeated polling: concurrent callers within the TTL
/// window observe the same result. Expiry is time-based; `invalidate`
/// forces the next fetch back to the sources.
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that never hits. Used in tests and anywhere repeat fetches
    /// must always go to the sources.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn get(&self, source_filter: Option<&str>, limit: usize) -> Option<Vec<MeterReading>> {
        if self.ttl.is_zero() {
            return None;
        }

        let key = (source_filter.map(str::to_string), limit);
        let entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                metrics::counter!("store_cache_hits_total").increment(1);
                Some(entry.readings.clone())
            }
            _ => {
                metrics::counter!("store_cache_misses_total").increment(1);
                None
            }
        }
    }

    pub fn insert(&self, source_filter: Option<&str>, limit: usize, readings: Vec<MeterReading>) {
        if self.ttl.is_zero() {
            return;
        }

        let key = (source_filter.map(str::to_string), limit);
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key,
            Entry {
                readings,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.clear();
    }
}
