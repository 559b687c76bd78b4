//! In-process cache backend
//!
//! A sharded concurrent map. Expired entries are purged lazily on read and
//! periodically by the [`Sweeper`](crate::cache::sweeper::Sweeper).

use crate::cache::entry::CacheEntry;
use crate::cache::{CacheStore, namespaced_key};
use crate::error::CacheError;
use dashmap::DashMap;
use log::debug;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, namespace: &str, key: &str, value: String, ttl: Duration) {
        let full_key = namespaced_key(namespace, key);
        debug!("Cached {} for {:?}", full_key, ttl);
        self.entries.insert(full_key, CacheEntry::new(value, ttl));
    }

    pub fn lookup(&self, namespace: &str, key: &str) -> Option<String> {
        let full_key = namespaced_key(namespace, key);

        match self.entries.get(&full_key) {
            None => return None,
            Some(entry) if !entry.is_expired() => return Some(entry.data().to_string()),
            Some(_) => {}
        }

        // Only drop it if it is still expired; a concurrent put may have refreshed it.
        if self
            .entries
            .remove_if(&full_key, |_, entry| entry.is_expired())
            .is_some()
        {
            debug!("Cache entry {} expired on read", full_key);
        }
        None
    }

    /// Removes the entry, reporting whether it was present and still live.
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .remove(&namespaced_key(namespace, key))
            .is_some_and(|(_, entry)| !entry.is_expired())
    }

    /// Physically removes every expired entry, one shard at a time.
    ///
    /// Returns the number of entries evicted.
    pub fn evict_expired(&self) -> usize {
        let mut evicted = 0;
        self.entries.retain(|key, entry| {
            if entry.is_expired() {
                debug!("Evicted by sweep: {}", key);
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for InMemoryCacheStore {
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.insert(namespace, key, value, ttl);
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lookup(namespace, key))
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, CacheError> {
        Ok(self.delete(namespace, key))
    }
}
