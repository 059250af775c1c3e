//! Merge cache: fully merged subtrees memoized per top-level key.

use crate::frozen::FrozenValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Memoized merge results keyed by top-level attribute key
#[derive(Debug, Default)]
pub struct MergeCache {
    entries: Mutex<HashMap<String, FrozenValue>>,
    stats: Mutex<CacheStats>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, computing and storing it on a miss. Absent
    /// results are not cached.
    pub fn get_or_compute(
        &self,
        key: &str,
        compute: impl FnOnce() -> Option<FrozenValue>,
    ) -> Option<FrozenValue> {
        if let Some(value) = self.entries.lock().get(key).cloned() {
            self.stats.lock().hits += 1;
            return Some(value);
        }
        self.stats.lock().misses += 1;
        debug!(key, "Recomputing merged attribute");
        let value = compute()?;
        self.entries.lock().insert(key.to_string(), value.clone());
        Some(value)
    }

    pub fn invalidate(&self, key: &str) {
        if self.entries.lock().remove(key).is_some() {
            debug!(key, "Invalidated merged attribute");
        }
        self.stats.lock().invalidations += 1;
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        debug!(cached = entries.len(), "Invalidated all merged attributes");
        entries.clear();
        self.stats.lock().invalidations += 1;
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }
}
