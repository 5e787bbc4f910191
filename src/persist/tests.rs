//! Tests for checkpoint stores

use super::*;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn sample_checkpoint() -> Checkpoint {
    let mut checkpoint = Checkpoint::new();
    checkpoint.watermark_name = "logs/2024/01/b.log".to_string();
    checkpoint.watermark_time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    checkpoint
        .retry_ledger
        .insert("logs/2024/01/a.log".to_string(), 2);
    checkpoint
}

// ============================================================================
// Key Tests
// ============================================================================

#[test]
fn test_source_key() {
    assert_eq!(
        source_key("gcs-input", "gs://bucket/logs/"),
        "gcs-input::gs://bucket/logs/"
    );
}

#[test]
fn test_file_path_is_encoded() {
    let store = FileCheckpointStore::new("/var/lib/poller");
    let path = store.path_for("input::s3://bucket/my_logs/");
    assert_eq!(
        path.to_str().unwrap(),
        "/var/lib/poller/input%3A%3As3%3A%2F%2Fbucket%2Fmy%5Flogs%2F.json"
    );
}

#[test]
fn test_similar_keys_use_distinct_files() {
    let store = FileCheckpointStore::new("/var/lib/poller");
    assert_ne!(
        store.path_for("in::s3://b/x/y"),
        store.path_for("in::s3://b/x_y")
    );
    assert_ne!(store.path_for("a b"), store.path_for("a_b"));
}

#[tokio::test]
async fn test_similar_keys_keep_separate_records() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());

    let mut first = Checkpoint::new();
    first.watermark_name = "from-a".to_string();
    let mut second = Checkpoint::new();
    second.watermark_name = "from-b".to_string();

    store.put("in::s3://b/x/y", &first).await.unwrap();
    store.put("in::s3://b/x_y", &second).await.unwrap();

    let loaded = store.get("in::s3://b/x/y").await.unwrap().unwrap();
    assert_eq!(loaded.watermark_name, "from-a");
    let loaded = store.get("in::s3://b/x_y").await.unwrap().unwrap();
    assert_eq!(loaded.watermark_name, "from-b");
}

// ============================================================================
// File Store Tests
// ============================================================================

#[tokio::test]
async fn test_file_put_and_get() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path().join("state"));
    let checkpoint = sample_checkpoint();

    store.put("k", &checkpoint).await.unwrap();
    let loaded = store.get("k").await.unwrap().unwrap();

    assert_eq!(loaded, checkpoint);
}

#[tokio::test]
async fn test_file_get_missing_key() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());

    assert!(store.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_put_overwrites() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());

    store.put("k", &sample_checkpoint()).await.unwrap();
    store.put("k", &Checkpoint::new()).await.unwrap();

    let loaded = store.get("k").await.unwrap().unwrap();
    assert!(loaded.is_empty());
    assert!(!store.path_for("k").with_extension("tmp").exists());
}

#[tokio::test]
async fn test_file_record_format() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());
    store.put("k", &sample_checkpoint()).await.unwrap();

    let raw = tokio::fs::read_to_string(store.path_for("k")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["object_name"], "logs/2024/01/b.log");
    assert_eq!(json["latest_entry_time"], "2024-01-02T03:04:05Z");
    assert_eq!(json["failed_jobs"]["logs/2024/01/a.log"], 2);
}

#[tokio::test]
async fn test_file_record_without_ledger() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());
    tokio::fs::write(
        store.path_for("k"),
        r#"{"object_name":"a.log","latest_entry_time":"2024-01-01T00:00:00Z"}"#,
    )
    .await
    .unwrap();

    let loaded = store.get("k").await.unwrap().unwrap();
    assert_eq!(loaded.watermark_name, "a.log");
    assert!(loaded.retry_ledger.is_empty());
}

#[tokio::test]
async fn test_file_invalid_json() {
    let dir = tempdir().unwrap();
    let store = FileCheckpointStore::new(dir.path());
    tokio::fs::write(store.path_for("k"), "{ invalid json }")
        .await
        .unwrap();

    let err = store.get("k").await.unwrap_err();
    assert!(matches!(err, crate::Error::Persistence { .. }));
}

// ============================================================================
// Memory Store Tests
// ============================================================================

#[tokio::test]
async fn test_memory_put_and_get() {
    let store = MemoryCheckpointStore::new();
    assert!(store.is_empty().await);

    store.put("k", &sample_checkpoint()).await.unwrap();

    assert_eq!(store.len().await, 1);
    assert_eq!(store.get("k").await.unwrap(), Some(sample_checkpoint()));
    assert!(store.get("other").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_clone_shares_records() {
    let store = MemoryCheckpointStore::new();
    let cloned = store.clone();

    store.put("k", &sample_checkpoint()).await.unwrap();

    assert!(cloned.get("k").await.unwrap().is_some());
}
