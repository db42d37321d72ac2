//! Key-value persistence
//!
//! Settings, the project list, the chat history and the active selection are
//! each stored whole as one JSON value under a fixed key. Reads fall back to a
//! caller-supplied default when the key is absent or its value no longer
//! deserializes.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::Database;

/// Key holding the serialized `AppSettings`
pub const SETTINGS_KEY: &str = "webforge-settings";
/// Key holding the serialized project list
pub const PROJECTS_KEY: &str = "webforge-projects";
/// Key holding the serialized chat history
pub const MESSAGES_KEY: &str = "webforge-messages";
/// Key holding the id of the active project
pub const ACTIVE_PROJECT_KEY: &str = "webforge-active-project";
/// Key holding the id of the active file
pub const ACTIVE_FILE_KEY: &str = "webforge-active-file";

/// Raw string storage keyed by fixed identifiers
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn set_raw(&self, key: &str, value: String) -> Result<()>;
}

/// Typed access on top of any [`KeyValueStore`]
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Read and deserialize `key`, or return `default` when absent or unreadable
    async fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let Some(raw) = self.get_raw(key).await? else {
            debug!(key, "No stored value, using default");
            return Ok(default);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "Stored value is unreadable, using default");
                Ok(default)
            }
        }
    }

    /// Serialize and store `value` under `key`
    async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// SQLite-backed store using the `kv_store` table
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wrap an opened (and migrated) database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}

/// Process-local store, used by tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Other("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
