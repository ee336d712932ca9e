//! Resume cache: a TTL-bounded mapping from industry-filter key to a
//! preloaded resume set, shared across concurrent workers within a batch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use crate::model::Resume;

#[derive(Debug, Clone)]
struct CacheEntry {
    resumes: Arc<Vec<Resume>>,
    inserted_at: SystemTime,
}

impl CacheEntry {
    fn new(resumes: Vec<Resume>) -> Self {
        Self {
            resumes: Arc::new(resumes),
            inserted_at: SystemTime::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed().map_or(true, |age| age > ttl)
    }
}

/// Diagnostic counters for cache effectiveness, read by `PerformanceMetrics` reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of `get` calls that returned a live entry.
    pub hits: u64,
    /// Number of `get` calls that found nothing or an expired entry.
    pub misses: u64,
    /// Number of distinct keys currently held.
    pub entries: usize,
}

/// A process-local, thread-safe cache mapping an industry-filter key to
/// a preloaded, immutable resume list. Reads and writes are serialized
/// by a single lock; once a list is published via `set`, it is never
/// mutated — callers receive a cheap `Arc` clone.
pub struct ResumeCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl ResumeCache {
    /// Create a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Return the cached list for `key` iff its age is below the
    /// configured TTL; otherwise evict it and return `None`.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<Resume>>> {
        use std::sync::atomic::Ordering;

        {
            let entries = self.entries.read().expect("cache lock poisoned");
            if let Some(entry) = entries.get(key) {
                if !entry.is_expired(self.ttl) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    log::debug!("resume cache hit for key '{key}'");
                    return Some(Arc::clone(&entry.resumes));
                }
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Entry was present but expired; evict it.
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("resume cache entry expired for key '{key}'");
        self.entries.write().expect("cache lock poisoned").remove(key);
        None
    }

    /// Record `resumes` under `key`, stamped with the current time.
    pub fn set(&self, key: impl Into<String>, resumes: Vec<Resume>) {
        let key = key.into();
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key.clone(), CacheEntry::new(resumes));
        log::debug!("resume cache populated for key '{key}'");
    }

    /// Drop every cached entry. Called when resident memory exceeds the
    /// configured limit.
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let count = entries.len();
        entries.clear();
        log::info!("resume cache cleared ({count} entries dropped)");
    }

    /// Current hit/miss/entry counters.
    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().expect("cache lock poisoned").len(),
        }
    }
}
