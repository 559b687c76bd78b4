//! Principal directory
//!
//! Maps phone numbers to stable account ids, registering unknown numbers on
//! first successful login.

use dashmap::DashMap;
use log::info;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque numeric account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalId(pub u64);

impl PrincipalId {
    /// The principal's storage root, relative to the object store base.
    ///
    /// Decimal rendering of the id, so distinct principals never share a root.
    pub fn storage_root(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub phone: String,
}

pub trait PrincipalDirectory: Send + Sync {
    /// Returns the principal for `phone`, creating it if needed. Concurrent
    /// calls for the same phone agree on one id.
    fn find_or_register(&self, phone: &str) -> Principal;

    fn find(&self, id: PrincipalId) -> Option<Principal>;
}

/// Process-local directory.
#[derive(Debug)]
pub struct InMemoryDirectory {
    by_phone: DashMap<String, PrincipalId>,
    by_id: DashMap<PrincipalId, Principal>,
    next_id: AtomicU64,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self {
            by_phone: DashMap::new(),
            by_id: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl PrincipalDirectory for InMemoryDirectory {
    fn find_or_register(&self, phone: &str) -> Principal {
        // The shard lock is held while the id is allocated.
        let id = *self
            .by_phone
            .entry(phone.to_string())
            .or_insert_with(|| {
                let id = PrincipalId(self.next_id.fetch_add(1, Ordering::Relaxed));
                info!("Registered principal {} for {}", id, phone);
                id
            });

        self.by_id
            .entry(id)
            .or_insert_with(|| Principal {
                id,
                phone: phone.to_string(),
            })
            .clone()
    }

    fn find(&self, id: PrincipalId) -> Option<Principal> {
        self.by_id.get(&id).map(|principal| principal.clone())
    }
}
