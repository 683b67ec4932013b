use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::models::Platform;

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Bounded in-memory cache where every entry expires after a fixed TTL.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Returns the value for `key`, or `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let cache = self.entries.read().ok()?;
        let entry = cache.get(key)?;

        if entry.is_expired() {
            return None;
        }

        Some(entry.value.clone())
    }

    pub fn insert(&self, key: String, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: String, value: V, ttl: Duration) {
        if let Ok(mut cache) = self.entries.write() {
            if !cache.contains_key(&key) && cache.len() >= self.max_entries {
                cache.retain(|_, entry| !entry.is_expired());

                if cache.len() >= self.max_entries {
                    let oldest = cache
                        .iter()
                        .min_by_key(|(_, entry)| entry.created_at)
                        .map(|(k, _)| k.clone());
                    if let Some(oldest) = oldest {
                        cache.remove(&oldest);
                    }
                }
            }

            cache.insert(key, CacheEntry::new(value, ttl));
        }
    }

    /// Clean up expired entries
    pub fn cleanup_expired(&self) {
        if let Ok(mut cache) = self.entries.write() {
            cache.retain(|_, entry| !entry.is_expired());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.entries.write() {
            cache.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, expired) = self
            .entries
            .read()
            .map(|c| (c.len(), c.values().filter(|e| e.is_expired()).count()))
            .unwrap_or((0, 0));

        CacheStats {
            entries,
            expired_entries: expired,
            capacity: self.max_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired_entries: usize,
    pub capacity: usize,
}

/// Cache key builder for consistent key generation
pub struct CacheKey;

impl CacheKey {
    pub fn profile(platform: Platform, handle: &str) -> String {
        format!("profile:{}:{}", platform.as_str(), handle.to_lowercase())
    }

    pub fn avatar(url: &str) -> String {
        format!("avatar:{}", url)
    }
}
