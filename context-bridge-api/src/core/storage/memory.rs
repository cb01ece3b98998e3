//! In-memory storage implementation
//!
//! Stores data in a DashMap. Data is lost when the process exits. Read and
//! write counters make it convenient for tests to assert on physical I/O.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::traits::{KeyValueStore, StoreResult, expiry_timestamp};

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory implementation of KeyValueStore
///
/// Expired entries are dropped lazily on read and by `purge_expired`.
/// Suitable for development and single-instance deployments.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: DashMap<String, Entry>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `put` calls applied
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now().timestamp();

        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
        };

        if expired {
            self.entries.remove(key);
            debug!("Dropped expired entry: {}", key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = ttl.map(|ttl| expiry_timestamp(Utc::now().timestamp(), ttl));
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now().timestamp();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}
