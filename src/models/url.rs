use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row in the `urls` table: a stored file reachable through its short code.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub id: i64,
    pub short_code: String,
    /// Generated on-disk name, `<unix-millis>-<shortCode><ext>`.
    pub filename: String,
    /// Client-supplied name at upload time, used for search.
    pub original_name: String,
    /// RFC 3339 UTC timestamp.
    pub uploaded_at: String,
    pub size: i64,
    pub mimetype: String,
    pub access_count: i64,
    pub last_accessed_at: Option<String>,
}

/// Fields the upload path supplies for a new record; the store assigns
/// `id`, `uploaded_at`, and the access-tracking columns.
#[derive(Debug, Clone)]
pub struct NewUrlRecord {
    pub short_code: String,
    pub filename: String,
    pub original_name: String,
    pub size: i64,
    pub mimetype: String,
}

/// Aggregates over the whole table, all zero when it is empty.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub count: i64,
    pub total_size: i64,
    pub total_access: i64,
    pub average_size: i64,
}
