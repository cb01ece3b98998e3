//! SQLite storage implementation
//!
//! One database file holds every namespace in a single `kv_entries` table.
//! Each [`SqliteKeyValueStore`] is a view over one namespace and shares the
//! connection with its siblings.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::traits::{KeyValueStore, StoreResult, expiry_timestamp};

/// Namespace holding conversation records
pub const CONTEXTS_NAMESPACE: &str = "contexts";

/// Namespace holding the fingerprint dedup index
pub const FINGERPRINTS_NAMESPACE: &str = "fingerprints";

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv_entries (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    expires_at INTEGER,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (namespace, key)
);

CREATE INDEX IF NOT EXISTS idx_kv_entries_expires
ON kv_entries(expires_at);
"#;

/// Shared SQLite connection
///
/// `rusqlite::Connection` is Send but not Sync, so it lives behind a tokio
/// Mutex and every namespace view locks it per statement.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        info!(db_path = %path.display(), "Initialized SQLite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Key-value view over one namespace
    pub fn namespace(&self, namespace: &str) -> SqliteKeyValueStore {
        SqliteKeyValueStore {
            conn: self.conn.clone(),
            namespace: namespace.to_string(),
        }
    }
}

/// Key-value store backed by one namespace of a [`SqliteDatabase`]
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    conn: Arc<Mutex<Connection>>,
    namespace: String,
}

impl SqliteKeyValueStore {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Utc::now().timestamp();
        let db = self.conn.lock().await;
        let value = db
            .query_row(
                "SELECT value FROM kv_entries
                 WHERE namespace = ?1 AND key = ?2
                   AND (expires_at IS NULL OR expires_at > ?3)",
                params![self.namespace, key, now],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        let now = Utc::now().timestamp();
        let expires_at = ttl.map(|ttl| expiry_timestamp(now, ttl));
        let db = self.conn.lock().await;
        db.execute(
            "INSERT INTO kv_entries (namespace, key, value, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![self.namespace, key, value, expires_at, now],
        )?;
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now().timestamp();
        let db = self.conn.lock().await;
        let removed = db.execute(
            "DELETE FROM kv_entries
             WHERE namespace = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
            params![self.namespace, now],
        )?;
        if removed > 0 {
            debug!(namespace = %self.namespace, removed, "Purged expired entries");
        }
        Ok(removed)
    }
}
