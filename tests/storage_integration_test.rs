//! Integration tests for the storage module
//!
//! These cover the store contract end to end: inserts and the uniqueness
//! guard, atomic access counting, ordering of the listing queries, and the
//! aggregate statistics.

use pelican::models::NewUrlRecord;
use pelican::storage::{SqliteStorage, Storage, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

/// File-backed test storage; a shared on-disk database keeps every pooled
/// connection on the same data, which in-memory sqlite does not.
async fn create_test_storage(dir: &TempDir) -> Arc<dyn Storage> {
    let db_path = dir.path().join("pelican-test.db");
    let url = format!("sqlite://{}", db_path.display());
    let storage = SqliteStorage::new(&url, 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn record(code: &str, original_name: &str, size: i64) -> NewUrlRecord {
    NewUrlRecord {
        short_code: code.to_string(),
        filename: format!("1700000000000-{code}.bin"),
        original_name: original_name.to_string(),
        size,
        mimetype: "application/octet-stream".to_string(),
    }
}

#[tokio::test]
async fn test_insert_and_find() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    let inserted = storage.insert(&record("abc123", "report.pdf", 42)).await.unwrap();
    assert!(inserted.id > 0);
    assert_eq!(inserted.short_code, "abc123");
    assert_eq!(inserted.original_name, "report.pdf");
    assert_eq!(inserted.access_count, 0);
    assert!(inserted.last_accessed_at.is_none());

    let found = storage.find_by_code("abc123").await.unwrap().unwrap();
    assert_eq!(found.id, inserted.id);

    assert!(storage.exists("abc123").await.unwrap());
    assert!(!storage.exists("zzzzzz").await.unwrap());
    assert!(storage.find_by_code("zzzzzz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_insert_same_code() {
    // The unique index must let exactly one of many racing inserts through.
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    let mut handles = vec![];
    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage_clone
                .insert(&record("race01", &format!("file{i}.txt"), 10))
                .await
        }));
    }

    let mut success_count = 0;
    let mut conflict_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(StorageError::Conflict) => conflict_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one insert should succeed");
    assert_eq!(conflict_count, 9, "All others should get conflict");
}

#[tokio::test]
async fn test_increment_access() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    storage.insert(&record("hit001", "a.txt", 5)).await.unwrap();

    storage.increment_access("hit001").await.unwrap();
    storage.increment_access("hit001").await.unwrap();

    let found = storage.find_by_code("hit001").await.unwrap().unwrap();
    assert_eq!(found.access_count, 2);
    assert!(found.last_accessed_at.is_some());

    // Unknown codes are a no-op, not an error
    storage.increment_access("nosuch").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_increments_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    storage.insert(&record("hot001", "hot.bin", 1)).await.unwrap();

    let mut handles = vec![];
    for _ in 0..50 {
        let storage_clone = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage_clone.increment_access("hot001").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let found = storage.find_by_code("hot001").await.unwrap().unwrap();
    assert_eq!(found.access_count, 50);
}

#[tokio::test]
async fn test_list_ordering_and_paging() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    for i in 0..5 {
        storage
            .insert(&record(&format!("page0{i}"), &format!("doc{i}.txt"), 10))
            .await
            .unwrap();
    }

    assert_eq!(storage.count().await.unwrap(), 5);

    let first_page = storage.list(2, 0).await.unwrap();
    assert_eq!(first_page.len(), 2);
    // Same uploaded_at is possible within a fast loop; the id tie-breaker
    // keeps newest-first deterministic.
    assert_eq!(first_page[0].short_code, "page04");
    assert_eq!(first_page[1].short_code, "page03");

    let last_page = storage.list(2, 4).await.unwrap();
    assert_eq!(last_page.len(), 1);
    assert_eq!(last_page[0].short_code, "page00");

    let recent = storage.recent(3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].short_code, "page04");
}

#[tokio::test]
async fn test_search_case_insensitive() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    storage.insert(&record("srch01", "Quarterly-Report.pdf", 10)).await.unwrap();
    storage.insert(&record("srch02", "holiday.jpg", 10)).await.unwrap();
    storage.insert(&record("srch03", "report-final.PDF", 10)).await.unwrap();

    let results = storage.search("report", 10).await.unwrap();
    assert_eq!(results.len(), 2);

    let results = storage.search("REPORT", 10).await.unwrap();
    assert_eq!(results.len(), 2);

    let results = storage.search("nothing-here", 10).await.unwrap();
    assert!(results.is_empty());

    // LIKE wildcards in the query must match literally
    let results = storage.search("%", 10).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_most_accessed_excludes_untouched() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    storage.insert(&record("pop001", "a.txt", 10)).await.unwrap();
    storage.insert(&record("pop002", "b.txt", 10)).await.unwrap();
    storage.insert(&record("pop003", "c.txt", 10)).await.unwrap();

    storage.increment_access("pop002").await.unwrap();
    storage.increment_access("pop002").await.unwrap();
    storage.increment_access("pop003").await.unwrap();

    let popular = storage.most_accessed(10).await.unwrap();
    assert_eq!(popular.len(), 2);
    assert_eq!(popular[0].short_code, "pop002");
    assert_eq!(popular[1].short_code, "pop003");
    assert!(popular.iter().all(|r| r.access_count > 0));
}

#[tokio::test]
async fn test_delete() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    storage.insert(&record("del001", "gone.txt", 10)).await.unwrap();

    assert!(storage.delete("del001").await.unwrap());
    assert!(!storage.exists("del001").await.unwrap());
    assert!(!storage.delete("del001").await.unwrap());
}

#[tokio::test]
async fn test_aggregate_stats() {
    let dir = TempDir::new().unwrap();
    let storage = create_test_storage(&dir).await;

    // Empty store: everything zero, no division-by-zero on the average
    let empty = storage.aggregate_stats().await.unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.total_size, 0);
    assert_eq!(empty.total_access, 0);
    assert_eq!(empty.average_size, 0);

    storage.insert(&record("agg001", "a.bin", 100)).await.unwrap();
    storage.insert(&record("agg002", "b.bin", 300)).await.unwrap();
    storage.increment_access("agg001").await.unwrap();
    storage.increment_access("agg001").await.unwrap();
    storage.increment_access("agg002").await.unwrap();

    let stats = storage.aggregate_stats().await.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.total_size, 400);
    assert_eq!(stats.total_access, 3);
    assert_eq!(stats.average_size, 200);
}
