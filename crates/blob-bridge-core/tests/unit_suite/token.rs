//! Continuation token unit tests.
//!
//! Tests for the offset/count token format covering:
//! - The exact wire encoding
//! - Page chaining up to the item total
//! - Rejection of malformed tokens before any I/O

use base64::{engine::general_purpose::STANDARD, Engine};
use blob_bridge_core::model::EnumerationFilter;
use blob_bridge_core::storage::token::{decode, encode, next_token, OffsetCursor};
use blob_bridge_core::storage::StorageClient;
use blob_bridge_core::Error;

use super::helpers::{filesystem, seed_numbered};

// ============================================================================
// Wire Format Tests
// ============================================================================

#[test]
fn token_is_base64_of_start_space_count() {
    assert_eq!(encode(0, 2), STANDARD.encode("0 2"));
    assert_eq!(encode(40, 20), STANDARD.encode("40 20"));
}

#[test]
fn token_decodes_to_cursor() {
    let cursor = decode(&STANDARD.encode("7 3")).expect("decode failed");
    assert_eq!(cursor, OffsetCursor::new(7, 3));
    assert_eq!(cursor.encode(), encode(7, 3));
}

#[test]
fn token_chain_covers_all_items_once() {
    let mut starts = Vec::new();
    let mut token = Some(encode(0, 3));
    while let Some(t) = token {
        let cursor = decode(&t).unwrap();
        starts.push(cursor.start);
        token = cursor.next(10);
    }
    assert_eq!(starts, vec![0, 3, 6, 9]);
}

#[test]
fn token_absent_when_page_reaches_total() {
    assert_eq!(next_token(3, 2, 5), None);
    assert_eq!(next_token(0, 1000, 3), None);
    assert_eq!(next_token(0, 2, 3), Some(encode(2, 2)));
}

// ============================================================================
// Malformed Token Tests
// ============================================================================

#[test]
fn token_rejects_garbage() {
    assert!(matches!(decode("%%%"), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        decode(&STANDARD.encode("only-one")),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        decode(&STANDARD.encode("1 x")),
        Err(Error::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn filesystem_enumerate_rejects_bad_token() {
    let (_dir, backend) = filesystem(2);
    seed_numbered(backend.as_ref(), 3).await;

    let result = backend
        .enumerate(&EnumerationFilter::default(), Some("not-a-token"))
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn filesystem_pages_use_offset_tokens() {
    let (_dir, backend) = filesystem(2);
    seed_numbered(backend.as_ref(), 5).await;
    let filter = EnumerationFilter::default();

    let first = backend.enumerate(&filter, None).await.unwrap();
    assert_eq!(first.count(), 2);
    assert_eq!(first.next_continuation_token, Some(encode(2, 2)));

    let last = backend.enumerate(&filter, Some(&encode(4, 2))).await.unwrap();
    assert_eq!(last.count(), 1);
    assert!(!last.has_more());
}
