//! Test helper utilities.
//!
//! Provides seeded backends and a fault-injecting client wrapper used
//! across unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use blob_bridge_core::model::{BlobMetadata, ByteStream, EnumerationFilter, EnumerationResult};
use blob_bridge_core::storage::{
    BackendKind, BlobStream, FilesystemBackend, MemoryBackend, StorageClient,
};
use blob_bridge_core::{Result, StorageError};

/// Write `count` blobs named `blob-00`, `blob-01`, ... each holding its index
/// as text.
pub async fn seed_numbered(client: &dyn StorageClient, count: usize) {
    for i in 0..count {
        client
            .write(&format!("blob-{:02}", i), "text/plain", Bytes::from(i.to_string()))
            .await
            .expect("seed write failed");
    }
}

/// Write each `(key, body)` pair.
pub async fn seed(client: &dyn StorageClient, blobs: &[(&str, &str)]) {
    for (key, body) in blobs {
        client
            .write(key, "", Bytes::from(body.to_string()))
            .await
            .expect("seed write failed");
    }
}

/// A memory backend with the given page size.
pub fn memory(page_size: usize) -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new().with_page_size(page_size))
}

/// A filesystem backend rooted in a fresh temporary directory.
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn filesystem(page_size: usize) -> (TempDir, Arc<FilesystemBackend>) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let backend = Arc::new(FilesystemBackend::new(dir.path().to_path_buf()).with_page_size(page_size));
    (dir, backend)
}

/// Keys of every item returned by a full enumeration.
pub async fn all_keys(client: &dyn StorageClient) -> Vec<String> {
    blob_bridge_core::storage::list_all(client, &EnumerationFilter::default())
        .await
        .expect("enumeration failed")
        .into_iter()
        .map(|b| b.key)
        .collect()
}

/// Wraps a client and fails writes once `fail_after` writes have succeeded.
pub struct FailingClient {
    inner: Arc<dyn StorageClient>,
    fail_after: usize,
    writes: AtomicUsize,
}

impl FailingClient {
    pub fn new(inner: Arc<dyn StorageClient>, fail_after: usize) -> Self {
        Self {
            inner,
            fail_after,
            writes: AtomicUsize::new(0),
        }
    }

    fn check_write(&self, key: &str) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(StorageError::Backend(format!("injected failure writing {}", key)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl StorageClient for FailingClient {
    fn name(&self) -> &str {
        "failing"
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> Result<BlobStream> {
        self.inner.get_stream(key).await
    }

    async fn get_metadata(&self, key: &str) -> Result<BlobMetadata> {
        self.inner.get_metadata(key).await
    }

    async fn write(&self, key: &str, content_type: &str, data: Bytes) -> Result<()> {
        self.check_write(key)?;
        self.inner.write(key, content_type, data).await
    }

    async fn write_stream(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        stream: ByteStream,
    ) -> Result<()> {
        self.check_write(key)?;
        self.inner
            .write_stream(key, content_type, content_length, stream)
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    fn generate_url(&self, key: &str) -> String {
        self.inner.generate_url(key)
    }

    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
        continuation_token: Option<&str>,
    ) -> Result<EnumerationResult> {
        self.inner.enumerate(filter, continuation_token).await
    }
}
