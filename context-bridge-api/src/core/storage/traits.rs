//! Storage trait definitions
//!
//! The relay only needs a key-value store with per-key expiry and atomic
//! single-key writes. Implementations can be in-memory, SQLite-backed, or any
//! other store offering the same guarantees.

use async_trait::async_trait;
use std::time::Duration;

/// Failure inside a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for key-value storage backends
///
/// Implementations must be thread-safe (Send + Sync) as they will be
/// shared across multiple async tasks.
///
/// Expiry is best-effort: a backend may keep returning an entry for a while
/// after its TTL has passed, so callers that care check their own timestamps.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value atomically
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()>;

    /// Physically remove entries whose TTL has passed
    async fn purge_expired(&self) -> StoreResult<usize>;
}

/// Unix timestamp `ttl` from `now`, saturating on overflow
pub(crate) fn expiry_timestamp(now: i64, ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    now.saturating_add(secs)
}
