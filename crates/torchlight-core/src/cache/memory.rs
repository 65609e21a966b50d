//! In-process cache store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use super::CacheStore;
use crate::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Thread-safe in-memory store with lazy expiry.
///
/// Expired entries read as misses and are dropped on the next write lock.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: &str, value: Value, expires_at: Option<Instant>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), Entry { value, expires_at });
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.is_live(Instant::now()) {
            Some(entry.value.clone())
        } else {
            debug!(key, "memory cache entry expired");
            None
        }
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.insert(key, value, Instant::now().checked_add(ttl));
        Ok(())
    }

    fn forever(&self, key: &str, value: Value) -> Result<()> {
        self.insert(key, value, None);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_put_and_get() {
        let cache = MemoryCache::new();
        cache.put("k", json!({"wrapped": "x"}), Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k"), Some(json!({"wrapped": "x"})));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.put("k", json!(1), Duration::ZERO).unwrap();
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_forever_does_not_expire() {
        let cache = MemoryCache::new();
        cache.forever("k", json!(1)).unwrap();
        assert_eq!(cache.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_expired_entries_are_pruned_on_write() {
        let cache = MemoryCache::new();
        cache.put("old", json!(1), Duration::ZERO).unwrap();
        cache.forever("new", json!(2)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_forget_and_flush() {
        let cache = MemoryCache::new();
        cache.forever("a", json!(1)).unwrap();
        cache.forever("b", json!(2)).unwrap();

        cache.forget("a").unwrap();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());

        cache.flush().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = MemoryCache::new();
        cache.forever("k", json!(1)).unwrap();
        cache.forever("k", json!(2)).unwrap();
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let cache = Arc::new(MemoryCache::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache.forever(&format!("key-{i}"), json!(i)).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get("key-3"), Some(json!(3)));
    }
}
