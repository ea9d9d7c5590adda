//! Settings Storage using SQLite
//!
//! Preferences are grouped by a namespace (the preferences file name on mobile
//! platforms), so several stores can share one database without key clashes.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{SettingsStore, SettingsTransaction},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use tracing::{debug, error};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        namespace TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        value_type TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (namespace, key)
    )
"#;

const UPSERT: &str = r#"
    INSERT INTO settings (namespace, key, value, value_type, updated_at)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(namespace, key) DO UPDATE SET
        value = excluded.value,
        value_type = excluded.value_type,
        updated_at = excluded.updated_at
"#;

/// SQLite-backed settings store implementation
///
/// Provides persistent key-value storage using SQLite:
/// - Type-checked value storage
/// - Transactional updates
/// - Async operations
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    namespace: String,
}

impl SqliteSettingsStore {
    /// Open (or create) the settings database at `db_path`, scoped to `namespace`
    pub async fn new(db_path: PathBuf, namespace: impl Into<String>) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

        let store = Self::with_pool(pool, namespace).await?;
        debug!(path = ?db_path, namespace = %store.namespace, "Initialized settings store");
        Ok(store)
    }

    /// Create an in-memory settings store (for testing)
    pub async fn in_memory(namespace: impl Into<String>) -> Result<Self> {
        // Every connection to `:memory:` is a separate database, so pin the pool to one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

        Self::with_pool(pool, namespace).await
    }

    async fn with_pool(pool: SqlitePool, namespace: impl Into<String>) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| {
                BridgeError::DatabaseError(format!("Failed to create table: {}", e))
            })?;

        Ok(Self {
            pool,
            namespace: namespace.into(),
        })
    }

    /// The namespace this store reads and writes
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current Unix timestamp in seconds
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    async fn set_value(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(&self.namespace)
            .bind(key)
            .bind(value)
            .bind(value_type)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to set setting: {}", e)))?;

        debug!(key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    /// Get a value and verify its type
    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT value, value_type FROM settings WHERE namespace = ? AND key = ?",
        )
        .bind(&self.namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to get setting: {}", e)))?;

        match row {
            Some(row) => {
                let value: String = row.get(0);
                let value_type: String = row.get(1);

                if value_type != expected_type {
                    error!(
                        key = key,
                        expected = expected_type,
                        actual = %value_type,
                        "Type mismatch"
                    );
                    return Err(BridgeError::OperationFailed(format!(
                        "Type mismatch: expected {}, got {}",
                        expected_type, value_type
                    )));
                }

                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key, "string").await
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, &value.to_string(), "i64").await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get_value(key, "i64").await? {
            Some(s) => Ok(Some(s.parse().map_err(|e| {
                BridgeError::OperationFailed(format!("Parse error: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::DatabaseError(format!("Failed to delete setting: {}", e))
            })?;

        debug!(key = key, "Deleted setting");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM settings WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
        let tx = self.pool.begin().await.map_err(|e| {
            BridgeError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(SqliteSettingsTransaction {
            tx: Some(tx),
            namespace: self.namespace.clone(),
        }))
    }
}

/// SQLite settings transaction
struct SqliteSettingsTransaction {
    tx: Option<sqlx::Transaction<'static, sqlx::Sqlite>>,
    namespace: String,
}

impl SqliteSettingsTransaction {
    async fn set_value(&mut self, key: &str, value: &str, value_type: &str) -> Result<()> {
        let tx = self.tx.as_mut().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        sqlx::query(UPSERT)
            .bind(&self.namespace)
            .bind(key)
            .bind(value)
            .bind(value_type)
            .bind(SqliteSettingsStore::now())
            .execute(&mut **tx)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to set setting: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl SettingsTransaction for SqliteSettingsTransaction {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn set_i64(&mut self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, &value.to_string(), "i64").await
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to commit: {}", e)))?;

        debug!("Committed transaction");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        tx.rollback()
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to rollback: {}", e)))?;

        debug!("Rolled back transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = SqliteSettingsStore::in_memory("uamp").await.unwrap();

        store.set_string("test_key", "test_value").await.unwrap();
        let value = store.get_string("test_key").await.unwrap();
        assert_eq!(value, Some("test_value".to_string()));
        assert!(store.has_key("test_key").await.unwrap());

        store.delete("test_key").await.unwrap();
        let value = store.get_string("test_key").await.unwrap();
        assert_eq!(value, None);
        assert!(!store.has_key("test_key").await.unwrap());
    }

    #[tokio::test]
    async fn test_i64_operations_and_type_check() {
        let store = SqliteSettingsStore::in_memory("uamp").await.unwrap();

        store.set_i64("position", 42_000).await.unwrap();
        assert_eq!(store.get_i64("position").await.unwrap(), Some(42_000));

        // Reading an i64 as a string is a type mismatch
        assert!(store.get_string("position").await.is_err());
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = SqliteSettingsStore::in_memory("uamp").await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("title", "Intro").await.unwrap();
        tx.set_i64("position", 5).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.get_string("title").await.unwrap(),
            Some("Intro".to_string())
        );
        assert_eq!(store.get_i64("position").await.unwrap(), Some(5));

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("title", "Outro").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(
            store.get_string("title").await.unwrap(),
            Some("Intro".to_string())
        );
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");

        let first = SqliteSettingsStore::new(path.clone(), "uamp").await.unwrap();
        let second = SqliteSettingsStore::new(path, "other").await.unwrap();

        first.set_string("key", "a").await.unwrap();
        assert_eq!(first.namespace(), "uamp");
        assert_eq!(second.get_string("key").await.unwrap(), None);
    }
}
