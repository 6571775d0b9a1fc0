//! # Keyward Storage - SQLite Backend
//!
//! SQLite implementation of [`DataKeyStore`]. Each named store gets its own
//! database file at `{base_path}/{name}.db`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use keyward_kms::WrappedDataKey;
use keyward_storage::{new_record_id, unix_now, DataKeyRecord, DataKeyStore, StorageError};

/// Database schema for wrapped data keys.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS data_keys (
    record_id     TEXT PRIMARY KEY,
    ciphertext    BLOB NOT NULL,
    master_key_id TEXT NOT NULL,
    created_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_data_keys_master_key ON data_keys (master_key_id)
"#;

/// SQLite-backed data key store.
#[derive(Clone)]
pub struct SqliteDataKeyStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteDataKeyStore {
    /// Opens or creates the store `name` under `base_path`.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Directory where store databases are kept
    /// * `name` - Store name (must match `[a-z0-9_-]{1,64}`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is invalid
    /// - The directory cannot be created
    /// - The database cannot be opened or migrated
    pub async fn open(base_path: impl AsRef<Path>, name: &str) -> Result<Self, StorageError> {
        Self::validate_name(name)?;

        let base = base_path.as_ref();
        std::fs::create_dir_all(base)
            .map_err(|e| StorageError::Connection(format!("failed to create directory: {e}")))?;

        let db_path = base.join(format!("{name}.db"));
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        debug!(store = %name, path = %db_path.display(), "Opening SQLite database");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool, db_path };
        store.migrate().await?;

        info!(store = %name, "SQLite data key store ready");

        Ok(store)
    }

    /// Validates that a store name is safe to use as a file name.
    ///
    /// Only allows: lowercase letters, digits, underscore, hyphen.
    fn validate_name(name: &str) -> Result<(), StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidInput("store name cannot be empty".into()));
        }

        if name.len() > 64 {
            return Err(StorageError::InvalidInput("store name too long".into()));
        }

        let valid = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidInput(
                "store name must match [a-z0-9_-]+".into(),
            ));
        }

        Ok(())
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        debug!("Running database migrations");

        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement.trim())
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(format!("migration failed: {e}")))?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for SqliteDataKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDataKeyStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DataKeyStore for SqliteDataKeyStore {
    async fn insert(&self, wrapped: &WrappedDataKey) -> Result<String, StorageError> {
        let now = unix_now();

        loop {
            let record_id = new_record_id()?;

            let result = sqlx::query(
                r#"
                INSERT INTO data_keys (record_id, ciphertext, master_key_id, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(record_id) DO NOTHING
                "#,
            )
            .bind(record_id.as_str())
            .bind(wrapped.ciphertext.as_slice())
            .bind(wrapped.master_key_id.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

            if result.rows_affected() == 1 {
                debug!(record_id = %record_id, master_key_id = %wrapped.master_key_id, "Data key stored");
                return Ok(record_id);
            }
        }
    }

    async fn get(&self, record_id: &str) -> Result<Option<DataKeyRecord>, StorageError> {
        let row: Option<(Vec<u8>, String, i64)> = sqlx::query_as(
            "SELECT ciphertext, master_key_id, created_at FROM data_keys WHERE record_id = ?",
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(row.map(|(ciphertext, master_key_id, created_at)| DataKeyRecord {
            record_id: record_id.to_string(),
            wrapped: WrappedDataKey {
                ciphertext,
                master_key_id,
            },
            created_at,
        }))
    }

    async fn delete(&self, record_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM data_keys WHERE record_id = ?")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
