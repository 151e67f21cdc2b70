//! Instrumented storage client decorator.
//!
//! Wraps any `StorageClient` and records latency, bytes transferred and
//! errors for every call.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;

use super::labels::{BackendLabels, StorageOperation};
use super::registry::{StorageMetrics, TimerGuard};
use crate::model::{BlobMetadata, ByteStream, EnumerationFilter, EnumerationResult};
use crate::storage::{BackendKind, BlobStream, StorageClient};
use crate::Result;

/// A storage client wrapper that records metrics for all operations.
///
/// # Example
///
/// ```rust,ignore
/// use blob_bridge_core::metrics::{InstrumentedStorageClient, StorageMetrics};
/// use blob_bridge_core::storage::create_backend_from_url;
///
/// let metrics = Arc::new(StorageMetrics::new());
/// let backend = create_backend_from_url("memory://")?;
/// let instrumented = InstrumentedStorageClient::new(backend, metrics.clone());
/// ```
pub struct InstrumentedStorageClient {
    /// The wrapped storage client.
    inner: Arc<dyn StorageClient>,

    /// Backend name used as the metric label.
    backend_name: String,

    metrics: Arc<StorageMetrics>,
}

impl InstrumentedStorageClient {
    pub fn new(inner: Arc<dyn StorageClient>, metrics: Arc<StorageMetrics>) -> Self {
        let backend_name = inner.name().to_string();
        Self {
            inner,
            backend_name,
            metrics,
        }
    }

    /// Get the inner storage client.
    pub fn inner(&self) -> &Arc<dyn StorageClient> {
        &self.inner
    }

    fn timer(&self, operation: StorageOperation) -> TimerGuard<'_> {
        TimerGuard::new(&self.metrics, &self.backend_name, operation)
    }

    fn observe<T>(&self, operation: StorageOperation, result: &Result<T>) {
        if let Err(e) = result {
            self.metrics.inc_error(&self.backend_name, operation, e);
        }
    }
}

/// Wrap `client` so every call is recorded in `metrics`.
pub fn instrument(
    client: Arc<dyn StorageClient>,
    metrics: Arc<StorageMetrics>,
) -> Arc<dyn StorageClient> {
    Arc::new(InstrumentedStorageClient::new(client, metrics))
}

#[async_trait]
impl StorageClient for InstrumentedStorageClient {
    fn name(&self) -> &str {
        &self.backend_name
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let result = {
            let _timer = self.timer(StorageOperation::Get);
            self.inner.get(key).await
        };
        self.observe(StorageOperation::Get, &result);
        if let Ok(data) = &result {
            self.metrics
                .inc_read_bytes(&self.backend_name, data.len() as u64);
        }
        result
    }

    async fn get_stream(&self, key: &str) -> Result<BlobStream> {
        let result = {
            let _timer = self.timer(StorageOperation::GetStream);
            self.inner.get_stream(key).await
        };
        self.observe(StorageOperation::GetStream, &result);

        // Bytes are counted as the caller drains the stream.
        let blob = result?;
        let counter = self
            .metrics
            .read_bytes_total
            .get_or_create(&BackendLabels::new(&self.backend_name))
            .clone();
        Ok(BlobStream {
            content_length: blob.content_length,
            stream: blob
                .stream
                .inspect_ok(move |chunk| {
                    counter.inc_by(chunk.len() as u64);
                })
                .boxed(),
        })
    }

    async fn get_metadata(&self, key: &str) -> Result<BlobMetadata> {
        let result = {
            let _timer = self.timer(StorageOperation::Head);
            self.inner.get_metadata(key).await
        };
        // Missing keys are an expected answer to `exists`.
        if !matches!(&result, Err(e) if e.is_not_found()) {
            self.observe(StorageOperation::Head, &result);
        }
        result
    }

    async fn write(&self, key: &str, content_type: &str, data: Bytes) -> Result<()> {
        let bytes_len = data.len() as u64;
        let result = {
            let _timer = self.timer(StorageOperation::Write);
            self.inner.write(key, content_type, data).await
        };
        self.observe(StorageOperation::Write, &result);
        if result.is_ok() {
            self.metrics.inc_write_bytes(&self.backend_name, bytes_len);
        }
        result
    }

    async fn write_stream(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        stream: ByteStream,
    ) -> Result<()> {
        let counter = self
            .metrics
            .write_bytes_total
            .get_or_create(&BackendLabels::new(&self.backend_name))
            .clone();
        let counted = stream
            .inspect_ok(move |chunk| {
                counter.inc_by(chunk.len() as u64);
            })
            .boxed();

        let result = {
            let _timer = self.timer(StorageOperation::WriteStream);
            self.inner
                .write_stream(key, content_type, content_length, counted)
                .await
        };
        self.observe(StorageOperation::WriteStream, &result);
        result
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let result = {
            let _timer = self.timer(StorageOperation::Delete);
            self.inner.delete(key).await
        };
        self.observe(StorageOperation::Delete, &result);
        result
    }

    fn generate_url(&self, key: &str) -> String {
        self.inner.generate_url(key)
    }

    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
        continuation_token: Option<&str>,
    ) -> Result<EnumerationResult> {
        let result = {
            let _timer = self.timer(StorageOperation::Enumerate);
            self.inner.enumerate(filter, continuation_token).await
        };
        self.observe(StorageOperation::Enumerate, &result);
        if let Ok(page) = &result {
            self.metrics
                .inc_enumerated(&self.backend_name, page.count() as u64);
        }
        result
    }
}
