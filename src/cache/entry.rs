//! Cache entries with an absolute expiry instant.

use std::time::Duration;
use tokio::time::Instant;

/// A stored value and the instant after which it no longer exists.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn data(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// An entry is expired from its expiry instant onwards.
    #[inline]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
