use crate::models::{NewUrlRecord, StoreStats, UrlRecord};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const SELECT_COLUMNS: &str = "id, short_code, filename, original_name, uploaded_at, size, mimetype, access_count, last_accessed_at";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn now_rfc3339() -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                filename TEXT NOT NULL,
                original_name TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                size INTEGER NOT NULL,
                mimetype TEXT NOT NULL DEFAULT 'application/octet-stream',
                access_count INTEGER NOT NULL DEFAULT 0,
                last_accessed_at TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_urls_short_code ON urls(short_code)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_urls_uploaded_at ON urls(uploaded_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert(&self, new: &NewUrlRecord) -> StorageResult<UrlRecord> {
        let uploaded_at = Self::now_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO urls (short_code, filename, original_name, uploaded_at, size, mimetype)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(&new.short_code)
        .bind(&new.filename)
        .bind(&new.original_name)
        .bind(&uploaded_at)
        .bind(new.size)
        .bind(&new.mimetype)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let record = sqlx::query_as::<_, UrlRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM urls WHERE short_code = ?"
        ))
        .bind(&new.short_code)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(record)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<UrlRecord>> {
        let record = sqlx::query_as::<_, UrlRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM urls WHERE short_code = ?"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn exists(&self, short_code: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM urls WHERE short_code = ?",
        )
        .bind(short_code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count > 0)
    }

    async fn increment_access(&self, short_code: &str) -> Result<()> {
        // Single statement so concurrent accesses never lose an increment.
        sqlx::query(
            r#"
            UPDATE urls
            SET access_count = access_count + 1, last_accessed_at = ?
            WHERE short_code = ?
            "#,
        )
        .bind(Self::now_rfc3339())
        .bind(short_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UrlRecord>> {
        let records = sqlx::query_as::<_, UrlRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM urls ORDER BY uploaded_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(records)
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM urls")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<UrlRecord>> {
        // LIKE is case-insensitive for ASCII in SQLite; escape its wildcards
        // so a query containing % or _ matches literally.
        let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{escaped}%");

        let records = sqlx::query_as::<_, UrlRecord>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM urls
            WHERE original_name LIKE ? ESCAPE '\'
            ORDER BY uploaded_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(records)
    }

    async fn most_accessed(&self, limit: i64) -> Result<Vec<UrlRecord>> {
        let records = sqlx::query_as::<_, UrlRecord>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM urls
            WHERE access_count > 0
            ORDER BY access_count DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(records)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<UrlRecord>> {
        let records = sqlx::query_as::<_, UrlRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM urls ORDER BY uploaded_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(records)
    }

    async fn delete(&self, short_code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM urls WHERE short_code = ?")
            .bind(short_code)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn aggregate_stats(&self) -> Result<StoreStats> {
        let (count, total_size, total_access, average_size) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(size), 0),
                    COALESCE(SUM(access_count), 0),
                    COALESCE(CAST(AVG(size) AS INTEGER), 0)
                FROM urls
                "#,
            )
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(StoreStats {
            count,
            total_size,
            total_access,
            average_size,
        })
    }
}
