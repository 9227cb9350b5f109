use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::models::analysis::AnalysisResult;

/// A cached analysis result and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: AnalysisResult,
    pub timestamp: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) >= ttl
    }
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// TTL-keyed store of completed analysis results.
///
/// Entries expire `ttl` after they were written. Expired entries are evicted
/// when read and by [`ResponseCache::sweep`].
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store a result, replacing any previous entry for the key.
    pub fn put(&self, key: &str, data: AnalysisResult) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp: Instant::now(),
            },
        );
        metrics::gauge!("analysis_cache_entries").set(self.entries.len() as f64);
    }

    /// Return the cached result if it has not expired.
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let now = Instant::now();
        // The read guard must be dropped before `remove_if` takes the shard lock.
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(self.ttl, now)).then(|| entry.data.clone()));

        match lookup {
            Some(Some(data)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("analysis_cache_hits_total").increment(1);
                Some(data)
            }
            Some(None) => {
                self.entries
                    .remove_if(key, |_, entry| entry.is_expired(self.ttl, now));
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache_key = %key, "Evicted expired cache entry on read");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(self.ttl, now));
        let removed = before.saturating_sub(self.entries.len());
        metrics::gauge!("analysis_cache_entries").set(self.entries.len() as f64);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
