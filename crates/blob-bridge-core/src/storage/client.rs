//! The storage contract every backend adapter implements.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

use crate::model::{
    BlobMetadata, ByteStream, EnumerationFilter, EnumerationResult, WriteRequest, WriteSource,
};
use crate::{Error, Result};

/// Default number of items returned per enumeration page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Broad family a backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Flat key space with no folder objects (S3, Azure, GCS, memory).
    ObjectStore,
    /// Directory tree with addressable, contentless folders (local disk).
    HierarchicalFilesystem,
}

/// Result of [`StorageClient::get_stream`]. The caller owns the stream.
pub struct BlobStream {
    pub content_length: u64,
    pub stream: ByteStream,
}

impl fmt::Debug for BlobStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Capability set shared by all storage backends.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Short backend name used in logs and metric labels
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Read the full contents of a key
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Open a key for streaming reads
    async fn get_stream(&self, key: &str) -> Result<BlobStream>;

    /// Fetch metadata for a key
    async fn get_metadata(&self, key: &str) -> Result<BlobMetadata>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        match self.get_metadata(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write a complete buffer to a key
    async fn write(&self, key: &str, content_type: &str, data: Bytes) -> Result<()>;

    /// Write a key from a chunked stream of `content_length` bytes
    async fn write_stream(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        stream: ByteStream,
    ) -> Result<()>;

    /// Write a batch sequentially, stopping at the first failure
    async fn write_many(&self, requests: Vec<WriteRequest>) -> Result<()> {
        for request in requests {
            match request.source {
                WriteSource::Data(data) => {
                    self.write(&request.key, &request.content_type, data).await?
                }
                WriteSource::Stream {
                    content_length,
                    stream,
                } => {
                    self.write_stream(&request.key, &request.content_type, content_length, stream)
                        .await?
                }
            }
        }
        Ok(())
    }

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Build a locator for a key from static configuration. Performs no I/O.
    fn generate_url(&self, key: &str) -> String;

    /// Fetch one page of keys matching `filter`, resuming at
    /// `continuation_token` when given.
    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
        continuation_token: Option<&str>,
    ) -> Result<EnumerationResult>;
}

/// Reject empty keys before any I/O.
pub(crate) fn require_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".to_string()));
    }
    Ok(())
}

/// A zero-length key ending in the separator denotes a folder.
pub(crate) fn is_folder_key(key: &str) -> bool {
    key.ends_with('/')
}
