//! Expiring cache
//!
//! A namespaced key/value store where every entry carries an expiry. Two
//! interchangeable backends share one contract:
//!
//! - [`InMemoryCacheStore`]: process-local concurrent map plus a [`Sweeper`]
//! - [`RemoteCacheStore`]: a RESP client for a TTL-native network service
//!
//! Expired entries are never returned. Backend failures surface as
//! [`CacheError`], never as a miss.

pub mod entry;
pub mod memory;
pub mod remote;
pub mod resp;
pub mod sweeper;

pub use memory::InMemoryCacheStore;
pub use remote::RemoteCacheStore;
pub use sweeper::Sweeper;

use crate::config::{CacheBackendKind, CacheConfig};
use crate::error::CacheError;
use log::info;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Builds the physical key. No escaping: namespaces must not be prefixes of
/// one another followed by `:`.
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

/// Contract shared by every cache backend.
pub trait CacheStore: Send + Sync {
    /// Stores `value`, replacing any previous entry for the same key.
    fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Returns the value if present and not expired.
    fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Deletes the entry. Removing an absent key is not an error.
    ///
    /// Returns true only for the call that removed a live entry.
    fn remove(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send;
}

/// The backend chosen at startup.
#[derive(Clone)]
pub enum Cache {
    InMemory(Arc<InMemoryCacheStore>),
    Remote(Arc<RemoteCacheStore>),
}

impl Cache {
    /// Builds the configured backend. The in-memory backend also gets its
    /// sweeper, which the caller owns and must stop on shutdown.
    pub fn from_config(config: &CacheConfig) -> (Self, Option<Sweeper>) {
        match config.backend {
            CacheBackendKind::Memory => {
                let store = Arc::new(InMemoryCacheStore::new());
                let sweeper = Sweeper::spawn(Arc::clone(&store), config.sweep_interval());
                info!("Using in-memory cache backend");
                (Cache::InMemory(store), Some(sweeper))
            }
            CacheBackendKind::Remote => {
                info!(
                    "Using remote cache backend at {} (timeout {:?})",
                    config.remote_address,
                    config.io_timeout()
                );
                let store = RemoteCacheStore::new(&config.remote_address, config.io_timeout());
                (Cache::Remote(Arc::new(store)), None)
            }
        }
    }
}

impl CacheStore for Cache {
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        match self {
            Cache::InMemory(store) => store.put(namespace, key, value, ttl).await,
            Cache::Remote(store) => store.put(namespace, key, value, ttl).await,
        }
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            Cache::InMemory(store) => store.get(namespace, key).await,
            Cache::Remote(store) => store.get(namespace, key).await,
        }
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, CacheError> {
        match self {
            Cache::InMemory(store) => store.remove(namespace, key).await,
            Cache::Remote(store) => store.remove(namespace, key).await,
        }
    }
}

impl<C: CacheStore> CacheStore for Arc<C> {
    fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send {
        (**self).put(namespace, key, value, ttl)
    }

    fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, CacheError>> + Send {
        (**self).get(namespace, key)
    }

    fn remove(
        &self,
        namespace: &str,
        key: &str,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send {
        (**self).remove(namespace, key)
    }
}
