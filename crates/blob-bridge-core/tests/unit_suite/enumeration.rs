//! Enumeration protocol unit tests.
//!
//! Tests for paged enumeration covering:
//! - Walking every page on flat and hierarchical backends
//! - Resuming from a token handed out by an earlier page
//! - Prefix, suffix and size filtering
//! - Folder entries on the filesystem

use futures::TryStreamExt;

use blob_bridge_core::model::EnumerationFilter;
use blob_bridge_core::storage::{enumerate_all, list_all, StorageClient};

use super::helpers::{all_keys, filesystem, memory, seed, seed_numbered};

// ============================================================================
// Paging Tests
// ============================================================================

#[tokio::test]
async fn memory_pages_until_token_absent() {
    let backend = memory(2);
    seed_numbered(backend.as_ref(), 5).await;
    let filter = EnumerationFilter::default();

    let mut token: Option<String> = None;
    let mut sizes = Vec::new();
    loop {
        let page = backend.enumerate(&filter, token.as_deref()).await.unwrap();
        sizes.push(page.count());
        match page.next_continuation_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(sizes.iter().sum::<usize>(), 5);
    assert!(sizes.iter().all(|&n| n <= 2));
}

#[tokio::test]
async fn memory_resume_from_token_returns_remainder() {
    let backend = memory(2);
    seed_numbered(backend.as_ref(), 5).await;
    let filter = EnumerationFilter::default();

    let first = backend.enumerate(&filter, None).await.unwrap();
    let token = first.next_continuation_token.expect("expected more pages");

    let rest: Vec<String> = enumerate_all(backend.as_ref(), filter, Some(token))
        .map_ok(|b| b.key)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(rest, vec!["blob-02", "blob-03", "blob-04"]);
}

#[tokio::test]
async fn enumerate_all_matches_list_all() {
    let (_dir, backend) = filesystem(3);
    seed_numbered(backend.as_ref(), 7).await;

    let streamed: Vec<String> =
        enumerate_all(backend.as_ref(), EnumerationFilter::default(), None)
            .map_ok(|b| b.key)
            .try_collect()
            .await
            .unwrap();
    assert_eq!(streamed.len(), 7);
    assert_eq!(streamed, all_keys(backend.as_ref()).await);
}

#[tokio::test]
async fn empty_backend_returns_single_empty_page() {
    let backend = memory(10);
    let page = backend
        .enumerate(&EnumerationFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(page.count(), 0);
    assert!(!page.has_more());
}

// ============================================================================
// Filter Tests
// ============================================================================

#[tokio::test]
async fn prefix_and_suffix_filter_on_both_backends() {
    let blobs = [
        ("logs/app.json", "{}"),
        ("logs/app.txt", "text"),
        ("logs/2024/db.json", "{\"a\":1}"),
        ("data/app.json", "{}"),
    ];
    let filter = EnumerationFilter::new()
        .with_prefix("logs/")
        .with_suffix(".json");

    let mem = memory(100);
    seed(mem.as_ref(), &blobs).await;
    let mut keys: Vec<String> = list_all(mem.as_ref(), &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.key)
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["logs/2024/db.json", "logs/app.json"]);

    let (_dir, fs) = filesystem(100);
    seed(fs.as_ref(), &blobs).await;
    let mut keys: Vec<String> = list_all(fs.as_ref(), &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.key)
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["logs/2024/db.json", "logs/app.json"]);
}

#[tokio::test]
async fn size_filter_is_inclusive() {
    let backend = memory(100);
    seed(
        backend.as_ref(),
        &[("a", "1"), ("bb", "22"), ("ccc", "333"), ("dddd", "4444")],
    )
    .await;

    let filter = EnumerationFilter::new().with_size_range(2, 3).unwrap();
    let keys: Vec<String> = list_all(backend.as_ref(), &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.key)
        .collect();
    assert_eq!(keys, vec!["bb", "ccc"]);
}

#[tokio::test]
async fn filesystem_prefix_is_case_insensitive() {
    let (_dir, backend) = filesystem(100);
    seed(backend.as_ref(), &[("Data/Report.CSV", "x"), ("other.csv", "y")]).await;

    let filter = EnumerationFilter::new().with_prefix("data/report");
    let keys: Vec<String> = list_all(backend.as_ref(), &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.key)
        .collect();
    assert_eq!(keys, vec!["Data/Report.CSV"]);
}

#[tokio::test]
async fn memory_prefix_is_case_insensitive() {
    let backend = memory(100);
    seed(
        backend.as_ref(),
        &[("Data/C.JSON", "{}"), ("Data/Sub/d.txt", "d"), ("data2/e.txt", "e")],
    )
    .await;

    for prefix in ["Data/", "data/", "DATA/C"] {
        let filter = EnumerationFilter::new().with_prefix(prefix);
        let keys: Vec<String> = list_all(backend.as_ref(), &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        let expected: &[&str] = if prefix == "DATA/C" {
            &["Data/C.JSON"]
        } else {
            &["Data/C.JSON", "Data/Sub/d.txt"]
        };
        assert_eq!(keys, expected, "prefix {}", prefix);
    }
}

#[tokio::test]
async fn mixed_case_prefix_agrees_across_backends() {
    let blobs = [("Data/C.JSON", "{}"), ("Data/x.txt", "x"), ("logs/a.txt", "a")];
    let filter = EnumerationFilter::new().with_prefix("Data/C");

    let mem = memory(100);
    seed(mem.as_ref(), &blobs).await;
    let (_dir, fs) = filesystem(100);
    seed(fs.as_ref(), &blobs).await;

    let clients: [&dyn StorageClient; 2] = [mem.as_ref(), fs.as_ref()];
    for client in clients {
        let keys: Vec<String> = list_all(client, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(keys, vec!["Data/C.JSON"], "backend {}", client.name());
    }
}

#[tokio::test]
async fn repeated_filtered_enumeration_is_stable() {
    let blobs = [
        ("logs/app.json", "{}"),
        ("logs/Report.JSON", "{\"b\":2}"),
        ("logs/2024/db.json", "{\"a\":1}"),
        ("logs/app.txt", "text"),
        ("data/app.json", "{}"),
    ];
    let filter = EnumerationFilter::new()
        .with_prefix("LOGS/")
        .with_suffix(".json")
        .with_size_range(2, 100)
        .unwrap();

    let mem = memory(2);
    seed(mem.as_ref(), &blobs).await;
    let (_dir, fs) = filesystem(2);
    seed(fs.as_ref(), &blobs).await;

    let clients: [&dyn StorageClient; 2] = [mem.as_ref(), fs.as_ref()];
    for client in clients {
        let first: Vec<String> = list_all(client, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        let second: Vec<String> = list_all(client, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(first, second, "backend {}", client.name());
        assert_eq!(first.len(), 3, "backend {}", client.name());
    }
}

// ============================================================================
// Folder Tests
// ============================================================================

#[tokio::test]
async fn filesystem_lists_folders_after_their_contents() {
    let (_dir, backend) = filesystem(100);
    seed(backend.as_ref(), &[("dir/a.txt", "a"), ("dir/sub/b.txt", "b")]).await;

    let blobs = list_all(backend.as_ref(), &EnumerationFilter::default())
        .await
        .unwrap();
    let keys: Vec<&str> = blobs.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["dir/a.txt", "dir/sub/b.txt", "dir/sub/", "dir/"]);

    let folders: Vec<bool> = blobs.iter().map(|b| b.is_folder).collect();
    assert_eq!(folders, vec![false, false, true, true]);
}

#[tokio::test]
async fn memory_never_lists_folders() {
    let backend = memory(100);
    backend
        .write("dir/", "", bytes::Bytes::new())
        .await
        .unwrap();
    seed(backend.as_ref(), &[("dir/a.txt", "a")]).await;

    let blobs = list_all(backend.as_ref(), &EnumerationFilter::default())
        .await
        .unwrap();
    assert_eq!(blobs.len(), 1);
    assert!(!blobs[0].is_folder);
}
