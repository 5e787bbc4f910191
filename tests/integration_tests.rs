//! Integration tests against a local directory source
//!
//! Tests the full flow: directory listing → worker pool → events → checkpoint file

use async_trait::async_trait;
use bytes::Bytes;
use solidafy_poller::metrics::CursorMetrics;
use solidafy_poller::persist::{CheckpointStore, FileCheckpointStore};
use solidafy_poller::publish::{ChannelPublisher, Event};
use solidafy_poller::{
    ObjectInfo, ObjectSource, PollerConfig, Result, StoreSource, WorkerCoordinator,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helpers
// ============================================================================

struct Bucket {
    objects: TempDir,
    state: TempDir,
}

impl Bucket {
    fn new() -> Self {
        Self {
            objects: tempfile::tempdir().unwrap(),
            state: tempfile::tempdir().unwrap(),
        }
    }

    fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.objects.path().join(name), contents).unwrap();
    }

    fn url(&self) -> String {
        self.objects.path().to_string_lossy().into_owned()
    }

    fn config(&self) -> PollerConfig {
        let mut config = PollerConfig::new("integration", self.url());
        config.state_dir = Some(self.state.path().to_path_buf());
        config.poll = false;
        config
    }

    fn store(&self) -> FileCheckpointStore {
        FileCheckpointStore::new(self.state.path())
    }

    fn state_file(&self) -> serde_json::Value {
        let store = self.store();
        let path = store.path_for(&self.config().source_key());
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}

async fn start(
    bucket: &Bucket,
    source: Arc<dyn ObjectSource>,
) -> (WorkerCoordinator, Arc<CursorMetrics>, mpsc::Receiver<Event>) {
    let metrics = Arc::new(CursorMetrics::new());
    let (publisher, events) = ChannelPublisher::channel(1024);

    let coordinator = WorkerCoordinator::start(
        &bucket.config(),
        source,
        Arc::new(publisher),
        Arc::new(bucket.store()),
        metrics.clone(),
    )
    .await
    .unwrap();

    (coordinator, metrics, events)
}

fn local_source(dir: &Path) -> Arc<dyn ObjectSource> {
    Arc::new(StoreSource::parse(&dir.to_string_lossy()).unwrap())
}

fn drain(events: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Local source failing a fixed set of objects; the rest download slowly
struct FlakySource {
    inner: Arc<dyn ObjectSource>,
    failing: HashSet<String>,
}

#[async_trait]
impl ObjectSource for FlakySource {
    async fn list(&self) -> Result<Vec<ObjectInfo>> {
        self.inner.list().await
    }

    async fn fetch(&self, name: &str) -> Result<Bytes> {
        if self.failing.contains(name) {
            return Err(solidafy_poller::Error::processing(name, "simulated outage"));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.inner.fetch(name).await
    }

    fn url(&self) -> &str {
        self.inner.url()
    }
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_local_directory_publishes_lines() {
    let bucket = Bucket::new();
    bucket.write("a.log", "first\nsecond\n");
    bucket.write("b.log", "third\n");

    let (coordinator, _metrics, mut events) =
        start(&bucket, local_source(bucket.objects.path())).await;
    coordinator.run(CancellationToken::new()).await.unwrap();

    let mut lines: Vec<(String, String)> = drain(&mut events)
        .into_iter()
        .map(|e| (e.object, e.message))
        .collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            ("a.log".to_string(), "first".to_string()),
            ("a.log".to_string(), "second".to_string()),
            ("b.log".to_string(), "third".to_string()),
        ]
    );

    let state = bucket.state_file();
    assert_eq!(state["object_name"], "b.log");
    assert!(state["latest_entry_time"].is_string());
    assert_eq!(state["failed_jobs"], serde_json::json!({}));
}

#[tokio::test]
async fn test_restart_resumes_from_checkpoint() {
    let bucket = Bucket::new();
    bucket.write("2024-01-01.log", "one\n");
    bucket.write("2024-01-02.log", "two\n");

    let (first, _, _events) = start(&bucket, local_source(bucket.objects.path())).await;
    let stats = first.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(stats.committed, 2);
    drop(first);

    let (second, _, mut events) = start(&bucket, local_source(bucket.objects.path())).await;
    assert_eq!(second.state().snapshot().watermark_name, "2024-01-02.log");

    let stats = second.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(stats.dispatched, 0);
    assert!(drain(&mut events).is_empty());

    bucket.write("2024-01-03.log", "three\n");
    let stats = second.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(stats.committed, 1);
    assert_eq!(drain(&mut events)[0].message, "three");
    assert_eq!(bucket.state_file()["object_name"], "2024-01-03.log");
}

#[tokio::test]
async fn test_retry_ledger_survives_restart() {
    let bucket = Bucket::new();
    bucket.write("a.log", "alpha\n");
    bucket.write("b.log", "beta\n");

    let flaky = Arc::new(FlakySource {
        inner: local_source(bucket.objects.path()),
        failing: HashSet::from(["a.log".to_string()]),
    });
    let (first, _, _events) = start(&bucket, flaky).await;
    let stats = first.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(stats.retrying, 1);
    assert_eq!(stats.committed, 1);
    drop(first);

    // the failure was recorded before b.log committed, so it was persisted
    assert_eq!(bucket.state_file()["failed_jobs"]["a.log"], 1);

    let (second, metrics, mut events) = start(&bucket, local_source(bucket.objects.path())).await;
    assert_eq!(metrics.tracked_failed_objects(), 1);

    let stats = second.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(drain(&mut events)[0].message, "alpha");

    let stored = bucket
        .store()
        .get(second.key())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.retry_ledger.is_empty());
    assert_eq!(stored.watermark_name, "b.log");
    assert_eq!(metrics.tracked_failed_objects(), 0);
}

#[tokio::test]
async fn test_file_selectors_limit_ingestion() {
    let bucket = Bucket::new();
    bucket.write("keep.log", "kept\n");
    bucket.write("skip.tmp", "skipped\n");

    let mut config = bucket.config();
    config.file_selectors = vec![r"\.log$".to_string()];
    let (publisher, mut events) = ChannelPublisher::channel(16);

    let coordinator = WorkerCoordinator::start(
        &config,
        local_source(bucket.objects.path()),
        Arc::new(publisher),
        Arc::new(bucket.store()),
        Arc::new(CursorMetrics::new()),
    )
    .await
    .unwrap();

    let stats = coordinator.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(stats.listed, 2);
    assert_eq!(stats.dispatched, 1);

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].object, "keep.log");
}

#[tokio::test]
async fn test_invalid_config_fails_before_listing() {
    let bucket = Bucket::new();
    let mut config = bucket.config();
    config.file_selectors = vec!["(".to_string()];

    let err = WorkerCoordinator::start(
        &config,
        local_source(bucket.objects.path()),
        Arc::new(ChannelPublisher::channel(1).0),
        Arc::new(bucket.store()),
        Arc::new(CursorMetrics::new()),
    )
    .await
    .unwrap_err();

    assert!(err.is_config());
}
