use crate::models::{NewUrlRecord, StoreStats, UrlRecord};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes, etc.)
    async fn init(&self) -> Result<()>;

    /// Insert a new record. The unique index on `short_code` is the final
    /// authority on code uniqueness; a duplicate yields `StorageError::Conflict`.
    async fn insert(&self, new: &NewUrlRecord) -> StorageResult<UrlRecord>;

    /// Look up a record by short code
    async fn find_by_code(&self, short_code: &str) -> Result<Option<UrlRecord>>;

    /// Whether a short code is already taken
    async fn exists(&self, short_code: &str) -> Result<bool>;

    /// Atomically bump `access_count` and stamp `last_accessed_at`.
    /// No-op when the code is unknown.
    async fn increment_access(&self, short_code: &str) -> Result<()>;

    /// Page through records, newest upload first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UrlRecord>>;

    /// Total number of records
    async fn count(&self) -> Result<i64>;

    /// Case-insensitive substring match on `original_name`, newest first
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<UrlRecord>>;

    /// Records with at least one access, most accessed first
    async fn most_accessed(&self, limit: i64) -> Result<Vec<UrlRecord>>;

    /// Newest uploads
    async fn recent(&self, limit: i64) -> Result<Vec<UrlRecord>>;

    /// Remove a record, returning whether a row was deleted
    async fn delete(&self, short_code: &str) -> Result<bool>;

    /// Table-wide aggregates, zero-valued for an empty store
    async fn aggregate_stats(&self) -> Result<StoreStats>;
}
