//! Copy engine unit tests.
//!
//! Tests for cross-backend copy and drain covering:
//! - Conservation of counts and bytes
//! - Stop limits and resuming from the returned token
//! - Backend failures captured in the statistics
//! - Draining hierarchical and flat backends

use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use blob_bridge_core::copy::{empty, BlobCopy};
use blob_bridge_core::model::EnumerationFilter;
use blob_bridge_core::storage::StorageClient;
use blob_bridge_core::CopyJobConfig;

use super::helpers::{all_keys, filesystem, memory, seed, seed_numbered, FailingClient};

// ============================================================================
// Copy Tests
// ============================================================================

#[tokio::test]
async fn copy_memory_to_filesystem_preserves_bytes() {
    let source = memory(3);
    seed(
        source.as_ref(),
        &[("a.txt", "alpha"), ("nested/b.txt", "beta"), ("nested/deep/c.txt", "")],
    )
    .await;
    let (_dir, destination) = filesystem(10);

    let stats = BlobCopy::new(source.clone(), destination.clone())
        .start(-1, None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(stats.success);
    assert!(stats.error.is_none());
    assert_eq!(stats.blobs_written, 3);
    assert_eq!(stats.bytes_written, 9);
    assert_eq!(stats.blobs_read, stats.blobs_written);
    assert_eq!(stats.bytes_read, stats.bytes_written);
    assert!(stats.continuation_token.is_none());
    assert!(stats.time.end.is_some());

    assert_eq!(
        destination.get("nested/b.txt").await.unwrap(),
        Bytes::from("beta")
    );
    assert_eq!(destination.get("nested/deep/c.txt").await.unwrap().len(), 0);
}

#[tokio::test]
async fn copy_stop_after_then_resume_covers_everything() {
    let source = memory(2);
    seed_numbered(source.as_ref(), 6).await;
    let destination = memory(10);
    let cancel = CancellationToken::new();

    let first = BlobCopy::new(source.clone(), destination.clone())
        .start(3, None, &cancel)
        .await
        .unwrap();
    assert!(first.success);
    assert_eq!(first.blobs_written, 3);
    let token = first
        .continuation_token
        .clone()
        .expect("stopped run should hand back a token");

    let second = BlobCopy::new(source.clone(), destination.clone())
        .with_continuation_token(token)
        .start(-1, None, &cancel)
        .await
        .unwrap();
    assert!(second.success);
    assert!(second.continuation_token.is_none());

    let mut copied = all_keys(destination.as_ref()).await;
    copied.sort();
    assert_eq!(copied, all_keys(source.as_ref()).await);
}

#[tokio::test]
async fn copy_applies_filter() {
    let source = memory(10);
    seed(
        source.as_ref(),
        &[("img/a.png", "png"), ("img/b.jpg", "jpg"), ("doc/c.png", "png")],
    )
    .await;
    let destination = memory(10);

    let filter = EnumerationFilter::new().with_prefix("img/").with_suffix(".PNG");
    let stats = BlobCopy::new(source, destination.clone())
        .start(-1, Some(filter), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.keys, vec!["img/a.png"]);
    assert_eq!(all_keys(destination.as_ref()).await, vec!["img/a.png"]);
}

#[tokio::test]
async fn copy_failure_is_reported_not_raised() {
    let source = memory(10);
    seed_numbered(source.as_ref(), 4).await;
    let destination: Arc<dyn StorageClient> = Arc::new(FailingClient::new(memory(10), 2));

    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = lines.clone();
    let stats = BlobCopy::new(source, destination)
        .with_logger(move |line| sink.lock().unwrap().push(line.to_string()))
        .start(-1, None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!stats.success);
    assert_eq!(stats.blobs_written, 2);
    assert_eq!(stats.blobs_read, 3);
    let error = stats.error.expect("error should be captured");
    assert!(error.to_string().contains("injected failure"));
    assert!(lines
        .lock()
        .unwrap()
        .iter()
        .any(|l| l.starts_with("Copy failed")));
}

#[tokio::test]
async fn copy_rejects_zero_stop_after() {
    let copy = BlobCopy::new(memory(10), memory(10));
    assert!(copy
        .start(0, None, &CancellationToken::new())
        .await
        .is_err());
}

#[tokio::test]
async fn copy_cancelled_before_start_writes_nothing() {
    let source = memory(10);
    seed_numbered(source.as_ref(), 3).await;
    let destination = memory(10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = BlobCopy::new(source, destination.clone())
        .start(-1, None, &cancel)
        .await
        .unwrap();
    assert_eq!(stats.blobs_written, 0);
    assert!(all_keys(destination.as_ref()).await.is_empty());
}

#[tokio::test]
async fn copy_job_from_yaml_runs() {
    let (src_dir, source) = filesystem(10);
    seed(source.as_ref(), &[("x/1.log", "one"), ("x/2.log", "two")]).await;
    let (dst_dir, _) = filesystem(10);

    let yaml = format!(
        "source:\n  backend: filesystem\n  path: {}\ndestination:\n  backend: filesystem\n  path: {}\nstop_after: 1\n",
        src_dir.path().display(),
        dst_dir.path().display()
    );
    let job = CopyJobConfig::from_yaml(&yaml).unwrap();
    let source = blob_bridge_core::create_backend(&job.source).unwrap();
    let destination = blob_bridge_core::create_backend(&job.destination).unwrap();

    let stats = BlobCopy::new(source, destination)
        .start(job.stop_after, job.filter.clone(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stats.blobs_written, 1);
    assert_eq!(stats.keys, vec!["x/1.log"]);
}

#[tokio::test]
async fn copy_and_empty_keep_keys_with_reserved_characters() {
    let blobs = [("a[1].txt", "one"), ("dir/report 100%.txt", "hundred")];
    let source = memory(10);
    seed(source.as_ref(), &blobs).await;
    let (_dir, disk) = filesystem(10);
    let back = memory(10);
    let cancel = CancellationToken::new();

    let stats = BlobCopy::new(source.clone(), disk.clone())
        .start(-1, None, &cancel)
        .await
        .unwrap();
    assert!(stats.success, "{:?}", stats.error);
    assert_eq!(disk.get("dir/report 100%.txt").await.unwrap(), Bytes::from("hundred"));

    let stats = BlobCopy::new(disk.clone(), back.clone())
        .start(-1, None, &cancel)
        .await
        .unwrap();
    assert!(stats.success, "{:?}", stats.error);
    assert_eq!(all_keys(back.as_ref()).await, all_keys(source.as_ref()).await);
    for (key, body) in blobs {
        assert_eq!(back.get(key).await.unwrap(), Bytes::from(body));
    }

    let result = empty(source.as_ref(), &cancel).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.count(), 2);
    assert!(all_keys(source.as_ref()).await.is_empty());
}

// ============================================================================
// Drain Tests
// ============================================================================

#[tokio::test]
async fn empty_removes_files_and_folders() {
    let (_dir, backend) = filesystem(2);
    seed(
        backend.as_ref(),
        &[("a.txt", "a"), ("dir/b.txt", "bb"), ("dir/sub/c.txt", "ccc")],
    )
    .await;

    let result = empty(backend.as_ref(), &CancellationToken::new()).await;
    assert!(result.success);
    assert!(result.error.is_none());
    assert_eq!(result.count(), 5);
    assert_eq!(result.bytes(), 6);
    assert!(all_keys(backend.as_ref()).await.is_empty());
}

#[tokio::test]
async fn empty_flat_backend_across_pages() {
    let backend = memory(3);
    seed_numbered(backend.as_ref(), 10).await;

    let result = empty(backend.as_ref(), &CancellationToken::new()).await;
    assert!(result.success);
    assert_eq!(result.count(), 10);
    assert!(all_keys(backend.as_ref()).await.is_empty());
}

#[tokio::test]
async fn empty_on_empty_backend_succeeds() {
    let result = empty(memory(10).as_ref(), &CancellationToken::new()).await;
    assert!(result.success);
    assert_eq!(result.count(), 0);
    assert!(result.time.end.is_some());
}
