//! Metadata snapshot storage
//!
//! Backends store one opaque JSON payload per account and know nothing about
//! the metadata type.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::{DbPool, PersistenceError};

/// Durable home for metadata snapshots
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Overwrite the account's snapshot
    async fn save_snapshot(&self, account_id: &str, payload: &str) -> Result<(), PersistenceError>;

    /// Latest snapshot for the account, if one was ever written
    async fn load_snapshot(&self, account_id: &str) -> Result<Option<String>, PersistenceError>;
}

/// SQLite-backed snapshot repository
pub struct SqliteMetadataRepository {
    pool: DbPool,
}

impl SqliteMetadataRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataBackend for SqliteMetadataRepository {
    async fn save_snapshot(&self, account_id: &str, payload: &str) -> Result<(), PersistenceError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO symbol_metadata (account_id, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(account_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id)
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save metadata for {}: {}", account_id, e);
            PersistenceError::QueryError(format!("Failed to save metadata: {}", e))
        })?;

        debug!("Saved metadata snapshot for {} ({} bytes)", account_id, payload.len());
        Ok(())
    }

    async fn load_snapshot(&self, account_id: &str) -> Result<Option<String>, PersistenceError> {
        let row = sqlx::query("SELECT payload FROM symbol_metadata WHERE account_id = ?1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to load metadata for {}: {}", account_id, e);
                PersistenceError::QueryError(format!("Failed to load metadata: {}", e))
            })?;

        Ok(row.map(|row| row.get::<String, _>("payload")))
    }
}

/// Process-local backend, for tests and for running without a database
#[derive(Default)]
pub struct InMemoryMetadataBackend {
    snapshots: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryMetadataBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataBackend for InMemoryMetadataBackend {
    async fn save_snapshot(&self, account_id: &str, payload: &str) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::QueryError(format!(
                "Write rejected for {}",
                account_id
            )));
        }
        self.snapshots
            .lock()
            .await
            .insert(account_id.to_string(), payload.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_snapshot(&self, account_id: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.snapshots.lock().await.get(account_id).cloned())
    }
}
