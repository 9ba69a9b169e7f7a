//! In-memory response cache keyed by normalized-query fingerprint.
//!
//! Bounded LRU with a per-entry TTL. Entries are immutable once stored;
//! crisis responses never enter. Nothing is persisted.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::models::{Category, CategoryScore, ResponseMethod};

/// A computed non-crisis response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub response: String,
    pub category: Category,
    pub confidence: f64,
    /// Method that produced the response originally.
    pub method: ResponseMethod,
    pub disclaimer: String,
    pub low_confidence: bool,
    pub secondary: Vec<CategoryScore>,
    /// Classifier version that produced the entry; `None` without a model.
    pub model_version: Option<String>,
    pub created_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Capacity below one is raised to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A live entry for `key`, promoted to most recently used.
    /// Expired entries are dropped and reported as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let expired = entries.peek(key)?.created_at.elapsed() >= self.ttl;
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).cloned()
    }

    pub fn put(&self, key: String, entry: CacheEntry) {
        if let Some((evicted, _)) = self.lock().push(key.clone(), entry) {
            if evicted != key {
                tracing::debug!("Response cache evicted least recently used entry");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let mut entries = self.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.created_at.elapsed() >= self.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    // entries are replaced whole, so poisoning leaves nothing half-written
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> CacheEntry {
        CacheEntry {
            response: text.into(),
            category: Category::AdlMobility,
            confidence: 0.8,
            method: ResponseMethod::MlModel,
            disclaimer: "consult".into(),
            low_confidence: false,
            secondary: Vec::new(),
            model_version: Some("v1".into()),
            created_at: Instant::now(),
        }
    }

    #[test]
    fn put_then_get() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.put("a".into(), entry("first"));
        assert_eq!(cache.get("a").unwrap().response, "first");
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn lru_entry_evicted_at_capacity() {
        let cache = ResponseCache::new(2, Duration::from_secs(60));
        cache.put("a".into(), entry("a"));
        cache.put("b".into(), entry("b"));
        // touch a so b becomes least recently used
        assert!(cache.get("a").is_some());
        cache.put("c".into(), entry("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = ResponseCache::new(10, Duration::from_millis(20));
        cache.put("a".into(), entry("a"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn prune_removes_only_expired() {
        let cache = ResponseCache::new(10, Duration::from_millis(50));
        let mut old = entry("old");
        old.created_at = Instant::now() - Duration::from_millis(100);
        cache.put("old".into(), old);
        cache.put("new".into(), entry("new"));

        assert_eq!(cache.prune_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn zero_capacity_becomes_one() {
        let cache = ResponseCache::new(0, Duration::from_secs(60));
        cache.put("a".into(), entry("a"));
        cache.put("b".into(), entry("b"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn clear_empties_cache() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.put("a".into(), entry("a"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
