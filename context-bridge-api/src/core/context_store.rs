//! Durable conversation history keyed by session
//!
//! Records live in one key-value namespace and a fingerprint index in a
//! second. The index lets a save of an unchanged conversation skip the
//! write entirely.

use chrono::Utc;
use context_bridge::Turn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::storage::{KeyValueStore, StoreResult};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One session's persisted conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub session_key: String,
    pub conversation: Vec<Turn>,
    /// Unix seconds after which the record is absent
    pub ttl: i64,
    /// Unix seconds of the last write
    pub last_updated: i64,
    /// Fingerprint of `conversation` as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl StoredRecord {
    pub fn is_expired(&self, now: i64) -> bool {
        self.ttl <= now
    }
}

/// Fingerprint index entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub session_key: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written { fingerprint: String },
    Unchanged { fingerprint: String },
}

impl SaveOutcome {
    pub fn fingerprint(&self) -> &str {
        match self {
            Self::Written { fingerprint } | Self::Unchanged { fingerprint } => fingerprint,
        }
    }
}

/// Lowercase hex SHA-256 of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct ContextStore {
    records: Arc<dyn KeyValueStore>,
    fingerprints: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ContextStore {
    pub fn new(records: Arc<dyn KeyValueStore>, fingerprints: Arc<dyn KeyValueStore>) -> Self {
        Self {
            records,
            fingerprints,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Load the stored record, `None` when absent or expired
    pub async fn try_load_record(&self, session_key: &str) -> StoreResult<Option<StoredRecord>> {
        let Some(raw) = self.records.get(session_key).await? else {
            return Ok(None);
        };
        let record: StoredRecord = serde_json::from_str(&raw)?;
        if record.is_expired(Utc::now().timestamp()) {
            debug!("Record for session {} has expired", session_key);
            return Ok(None);
        }
        Ok(Some(record))
    }

    pub async fn try_load(&self, session_key: &str) -> StoreResult<Vec<Turn>> {
        Ok(self
            .try_load_record(session_key)
            .await?
            .map(|record| record.conversation)
            .unwrap_or_default())
    }

    /// Load history, falling back to an empty conversation on any fault
    pub async fn load(&self, session_key: &str) -> Vec<Turn> {
        match self.try_load(session_key).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!("Failed to load context for session {}: {}", session_key, e);
                Vec::new()
            },
        }
    }

    pub async fn try_save(
        &self,
        session_key: &str,
        conversation: &[Turn],
    ) -> StoreResult<SaveOutcome> {
        let serialized = serde_json::to_vec(conversation)?;
        let fingerprint = fingerprint(&serialized);

        match self.lookup_fingerprint(&fingerprint).await {
            Ok(Some(entry)) if entry.session_key == session_key => {
                if self.is_current(session_key, &fingerprint).await {
                    debug!(
                        "Conversation for session {} unchanged ({}), skipping write",
                        session_key, fingerprint
                    );
                    return Ok(SaveOutcome::Unchanged { fingerprint });
                }
            },
            Ok(_) => {},
            Err(e) => warn!("Fingerprint lookup failed, writing anyway: {}", e),
        }

        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let record = StoredRecord {
            session_key: session_key.to_string(),
            conversation: conversation.to_vec(),
            ttl: now.saturating_add(ttl_secs),
            last_updated: now,
            fingerprint: Some(fingerprint.clone()),
        };
        self.records
            .put(session_key, serde_json::to_string(&record)?, Some(self.ttl))
            .await?;

        let entry = FingerprintEntry {
            session_key: session_key.to_string(),
            created_at: now,
        };
        self.fingerprints
            .put(&fingerprint, serde_json::to_string(&entry)?, Some(self.ttl))
            .await?;

        Ok(SaveOutcome::Written { fingerprint })
    }

    /// Persist history, reporting faults as `false`
    pub async fn save(&self, session_key: &str, conversation: &[Turn]) -> bool {
        match self.try_save(session_key, conversation).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to save context for session {}: {}", session_key, e);
                false
            },
        }
    }

    // index hits are confirmed against the live record
    async fn is_current(&self, session_key: &str, fingerprint: &str) -> bool {
        match self.try_load_record(session_key).await {
            Ok(Some(record)) => record.fingerprint.as_deref() == Some(fingerprint),
            Ok(None) => false,
            Err(e) => {
                warn!("Could not confirm stored fingerprint for {}: {}", session_key, e);
                false
            },
        }
    }

    async fn lookup_fingerprint(&self, fingerprint: &str) -> StoreResult<Option<FingerprintEntry>> {
        match self.fingerprints.get(fingerprint).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Purge expired entries from both namespaces
    pub async fn sweep_expired(&self) -> StoreResult<usize> {
        let records = self.records.purge_expired().await?;
        let fingerprints = self.fingerprints.purge_expired().await?;
        Ok(records + fingerprints)
    }

    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.sweep_expired().await {
                    Ok(0) => {},
                    Ok(removed) => info!("Swept {} expired context entries", removed),
                    Err(e) => warn!("Expiry sweep failed: {}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{InMemoryKeyValueStore, StoreError};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Backend("unreachable".to_string()))
        }

        async fn put(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> StoreResult<()> {
            Err(StoreError::Backend("unreachable".to_string()))
        }

        async fn purge_expired(&self) -> StoreResult<usize> {
            Err(StoreError::Backend("unreachable".to_string()))
        }
    }

    fn memory_store() -> (ContextStore, Arc<InMemoryKeyValueStore>, Arc<InMemoryKeyValueStore>) {
        let records = Arc::new(InMemoryKeyValueStore::new());
        let fingerprints = Arc::new(InMemoryKeyValueStore::new());
        let store = ContextStore::new(records.clone(), fingerprints.clone());
        (store, records, fingerprints)
    }

    fn conversation() -> Vec<Turn> {
        vec![Turn::user("hi"), Turn::assistant("hello")]
    }

    #[tokio::test]
    async fn test_unseen_key_loads_empty() {
        let (store, _, _) = memory_store();
        assert!(store.load("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (store, _, _) = memory_store();
        assert!(store.save("s1", &conversation()).await);
        assert_eq!(store.load("s1").await, conversation());

        let record = store.try_load_record("s1").await.unwrap().unwrap();
        assert_eq!(record.session_key, "s1");
        assert_eq!(record.ttl - record.last_updated, 24 * 60 * 60);
    }

    #[tokio::test]
    async fn test_identical_save_writes_once() {
        let (store, records, fingerprints) = memory_store();

        let first = store.try_save("s1", &conversation()).await.unwrap();
        let second = store.try_save("s1", &conversation()).await.unwrap();

        assert!(matches!(first, SaveOutcome::Written { .. }));
        assert!(matches!(second, SaveOutcome::Unchanged { .. }));
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(records.writes(), 1);
        assert_eq!(fingerprints.writes(), 1);
    }

    #[tokio::test]
    async fn test_reverting_to_earlier_content_is_written() {
        let (store, records, _) = memory_store();
        let first = conversation();
        let second = vec![Turn::user("b"), Turn::assistant("B")];

        store.try_save("k", &first).await.unwrap();
        store.try_save("k", &second).await.unwrap();
        let outcome = store.try_save("k", &first).await.unwrap();

        assert!(matches!(outcome, SaveOutcome::Written { .. }));
        assert_eq!(records.writes(), 3);
        assert_eq!(store.load("k").await, first);

        // now current again, so a repeat is a no-op
        let repeat = store.try_save("k", &first).await.unwrap();
        assert!(matches!(repeat, SaveOutcome::Unchanged { .. }));
        assert_eq!(records.writes(), 3);
    }

    #[tokio::test]
    async fn test_index_hit_without_record_is_written() {
        let (store, records, _) = memory_store();
        store.try_save("k", &conversation()).await.unwrap();

        // record gone (e.g. swept) while the index entry survives
        let record = StoredRecord {
            session_key: "k".to_string(),
            conversation: conversation(),
            ttl: Utc::now().timestamp() - 1,
            last_updated: Utc::now().timestamp() - 100,
            fingerprint: None,
        };
        records
            .put("k", serde_json::to_string(&record).unwrap(), None)
            .await
            .unwrap();

        let outcome = store.try_save("k", &conversation()).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Written { .. }));
        assert_eq!(store.load("k").await, conversation());
    }

    #[tokio::test]
    async fn test_same_content_other_session_is_written() {
        let (store, records, _) = memory_store();

        store.try_save("s1", &conversation()).await.unwrap();
        let outcome = store.try_save("s2", &conversation()).await.unwrap();

        assert!(matches!(outcome, SaveOutcome::Written { .. }));
        assert_eq!(records.writes(), 2);
        assert_eq!(store.load("s2").await, conversation());
    }

    #[tokio::test]
    async fn test_fingerprint_is_sha256_of_serialized_conversation() {
        let (store, _, fingerprints) = memory_store();
        let outcome = store.try_save("s1", &conversation()).await.unwrap();

        let expected = fingerprint(&serde_json::to_vec(&conversation()).unwrap());
        assert_eq!(outcome.fingerprint(), expected);

        let raw = fingerprints.get(&expected).await.unwrap().unwrap();
        let entry: FingerprintEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.session_key, "s1");
    }

    #[tokio::test]
    async fn test_expired_record_loads_empty() {
        let (store, records, _) = memory_store();
        let record = StoredRecord {
            session_key: "old".to_string(),
            conversation: conversation(),
            ttl: Utc::now().timestamp() - 1,
            last_updated: Utc::now().timestamp() - 100,
            fingerprint: None,
        };
        records
            .put("old", serde_json::to_string(&record).unwrap(), None)
            .await
            .unwrap();

        assert!(store.load("old").await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_degrades_to_empty() {
        let (store, records, _) = memory_store();
        records.put("bad", "{not json".to_string(), None).await.unwrap();

        assert!(store.try_load("bad").await.is_err());
        assert!(store.load("bad").await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_backend_degrades() {
        let store = ContextStore::new(Arc::new(FailingStore), Arc::new(FailingStore));

        assert!(store.load("s1").await.is_empty());
        assert!(!store.save("s1", &conversation()).await);
    }

    #[tokio::test]
    async fn test_index_lookup_failure_still_writes() {
        let records = Arc::new(InMemoryKeyValueStore::new());
        let store = ContextStore::new(records.clone(), Arc::new(FailingStore));

        // record lands, the index write fails afterwards
        assert!(!store.save("s1", &conversation()).await);
        assert_eq!(records.writes(), 1);
        assert_eq!(store.load("s1").await, conversation());
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let (store, records, fingerprints) = memory_store();
        let store = store.with_ttl(Duration::ZERO);

        assert!(store.save("s1", &conversation()).await);
        assert_eq!(store.sweep_expired().await.unwrap(), 2);
        assert!(records.is_empty());
        assert!(fingerprints.is_empty());
    }
}
