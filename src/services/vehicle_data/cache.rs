use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::models::VehicleOption;

struct CacheEntry {
    options: Vec<VehicleOption>,
    stored_at: DateTime<Utc>,
}

/// Time-boxed store for vehicle lookups, shared by all requests in the process.
///
/// An entry is served while its age is under the TTL. Expired entries are
/// dropped on read so the caller refetches, and swept on every write.
pub struct VehicleDataCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl VehicleDataCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<VehicleOption>> {
        let now = self.clock.now();
        let mut entries = self.entries();

        let expired = match entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => {
                return Some(entry.options.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
            tracing::debug!(key, "vehicle cache entry expired");
        }
        None
    }

    /// Stores `options` under `key` and sweeps out every expired entry.
    pub fn put(&self, key: &str, options: Vec<VehicleOption>) {
        let now = self.clock.now();
        let mut entries = self.entries();

        let before = entries.len();
        entries.retain(|_, entry| now - entry.stored_at < self.ttl);
        if entries.len() < before {
            tracing::debug!(swept = before - entries.len(), "vehicle cache entries expired");
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                options,
                stored_at: now,
            },
        );
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
