//! Storage contract unit tests.
//!
//! The same behavioral checks run against every local backend so the
//! flat and hierarchical implementations stay interchangeable.

use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;

use blob_bridge_core::model::{WriteRequest, DEFAULT_CONTENT_TYPE};
use blob_bridge_core::storage::{create_backend_from_url, StorageClient};
use blob_bridge_core::Error;

use super::helpers::{all_keys, filesystem, memory};

async fn check_round_trip(client: &dyn StorageClient) {
    let data = Bytes::from("Hello, blob!");
    client
        .write("docs/hello.txt", "text/plain", data.clone())
        .await
        .unwrap();

    assert_eq!(client.get("docs/hello.txt").await.unwrap(), data);
    assert!(client.exists("docs/hello.txt").await.unwrap());

    let meta = client.get_metadata("docs/hello.txt").await.unwrap();
    assert_eq!(meta.key, "docs/hello.txt");
    assert_eq!(meta.content_length, data.len() as u64);
    assert!(!meta.is_folder);

    client
        .write("docs/hello.txt", "text/plain", Bytes::from("v2"))
        .await
        .unwrap();
    assert_eq!(client.get("docs/hello.txt").await.unwrap(), Bytes::from("v2"));

    client.delete("docs/hello.txt").await.unwrap();
    assert!(!client.exists("docs/hello.txt").await.unwrap());
}

async fn check_missing_keys(client: &dyn StorageClient) {
    assert!(client.get("nope").await.unwrap_err().is_not_found());
    assert!(client.get_metadata("nope").await.unwrap_err().is_not_found());
    assert!(client.delete("nope").await.unwrap_err().is_not_found());
    assert!(!client.exists("nope").await.unwrap());
}

async fn check_empty_key_rejected(client: &dyn StorageClient) {
    assert!(matches!(
        client.get("").await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.write("  ", "", Bytes::new()).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        client.delete("").await,
        Err(Error::InvalidArgument(_))
    ));
}

async fn check_streaming(client: &dyn StorageClient) {
    let chunks = vec![
        Ok(Bytes::from("stream")),
        Ok(Bytes::from("ing ")),
        Ok(Bytes::from("data")),
    ];
    client
        .write_stream("big.bin", "", 14, stream::iter(chunks).boxed())
        .await
        .unwrap();

    let blob = client.get_stream("big.bin").await.unwrap();
    assert_eq!(blob.content_length, 14);
    let body: Vec<Bytes> = blob.stream.try_collect().await.unwrap();
    assert_eq!(body.concat(), b"streaming data".to_vec());
}

async fn check_write_many(client: &dyn StorageClient) {
    let requests = vec![
        WriteRequest::from_bytes("batch/1", "", Bytes::from("one")),
        WriteRequest::from_stream(
            "batch/2",
            "text/plain",
            3,
            stream::iter(vec![Ok(Bytes::from("two"))]).boxed(),
        ),
    ];
    client.write_many(requests).await.unwrap();

    assert_eq!(client.get("batch/1").await.unwrap(), Bytes::from("one"));
    assert_eq!(client.get("batch/2").await.unwrap(), Bytes::from("two"));
}

// ============================================================================
// Memory Backend
// ============================================================================

#[tokio::test]
async fn memory_round_trip() {
    check_round_trip(memory(10).as_ref()).await;
}

#[tokio::test]
async fn memory_missing_keys() {
    check_missing_keys(memory(10).as_ref()).await;
}

#[tokio::test]
async fn memory_empty_key_rejected() {
    check_empty_key_rejected(memory(10).as_ref()).await;
}

#[tokio::test]
async fn memory_streaming() {
    check_streaming(memory(10).as_ref()).await;
}

#[tokio::test]
async fn memory_write_many() {
    check_write_many(memory(10).as_ref()).await;
}

#[tokio::test]
async fn memory_listed_keys_resolve_verbatim() {
    let backend = memory(10);
    let keys = ["a[1].txt", "dir/caf\u{e9} #2.txt", "report 100%.txt"];
    for key in keys {
        backend.write(key, "", Bytes::from(key)).await.unwrap();
    }

    let listed = all_keys(backend.as_ref()).await;
    assert_eq!(listed, keys);
    for key in &listed {
        assert_eq!(backend.get(key).await.unwrap(), Bytes::from(key.clone()));
        assert_eq!(backend.get_metadata(key).await.unwrap().key, *key);
    }
    for key in &listed {
        backend.delete(key).await.unwrap();
    }
    assert!(all_keys(backend.as_ref()).await.is_empty());
}

#[tokio::test]
async fn memory_rejects_unrepresentable_keys() {
    let backend = memory(10);
    for key in ["a//b.txt", "a/./b.txt", "a/../b.txt", "bell\u{7}.txt"] {
        assert!(matches!(
            backend.write(key, "", Bytes::from("x")).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            backend.get(key).await,
            Err(Error::InvalidArgument(_))
        ));
    }
    assert!(all_keys(backend.as_ref()).await.is_empty());
}

#[tokio::test]
async fn memory_default_content_type() {
    let backend = memory(10);
    backend.write("x", "", Bytes::from("x")).await.unwrap();
    let meta = backend.get_metadata("x").await.unwrap();
    assert_eq!(meta.content_type, DEFAULT_CONTENT_TYPE);
}

// ============================================================================
// Filesystem Backend
// ============================================================================

#[tokio::test]
async fn filesystem_round_trip() {
    let (_dir, backend) = filesystem(10);
    check_round_trip(backend.as_ref()).await;
}

#[tokio::test]
async fn filesystem_missing_keys() {
    let (_dir, backend) = filesystem(10);
    check_missing_keys(backend.as_ref()).await;
}

#[tokio::test]
async fn filesystem_empty_key_rejected() {
    let (_dir, backend) = filesystem(10);
    check_empty_key_rejected(backend.as_ref()).await;
}

#[tokio::test]
async fn filesystem_streaming() {
    let (_dir, backend) = filesystem(10);
    check_streaming(backend.as_ref()).await;
}

#[tokio::test]
async fn filesystem_write_many() {
    let (_dir, backend) = filesystem(10);
    check_write_many(backend.as_ref()).await;
}

#[tokio::test]
async fn filesystem_folder_delete_requires_empty() {
    let (_dir, backend) = filesystem(10);
    backend.write("dir/a.txt", "", Bytes::from("a")).await.unwrap();

    assert!(backend.delete("dir/").await.is_err());
    backend.delete("dir/a.txt").await.unwrap();
    backend.delete("dir/").await.unwrap();
    assert!(all_keys(backend.as_ref()).await.is_empty());
}

#[tokio::test]
async fn filesystem_rejects_traversal() {
    let (_dir, backend) = filesystem(10);
    assert!(backend.get("../etc/passwd").await.is_err());
    assert!(backend
        .write("a/../../escape.txt", "", Bytes::from("x"))
        .await
        .is_err());
}

// ============================================================================
// Factory
// ============================================================================

#[tokio::test]
async fn backends_from_urls_are_interchangeable() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("file://{}", dir.path().display());

    let clients: Vec<Arc<dyn StorageClient>> = vec![
        create_backend_from_url("memory://").unwrap(),
        create_backend_from_url(&url).unwrap(),
    ];
    for client in clients {
        check_round_trip(client.as_ref()).await;
        check_missing_keys(client.as_ref()).await;
    }
}
