//! Value types shared by every backend: object metadata, enumeration
//! filters and pages, and queued writes.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Error, Result};

/// Content type used when a caller supplies none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Chunked byte stream used for streaming reads and writes.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Metadata describing one stored object or folder.
///
/// Equality and hashing consider only the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Object key, `/`-separated. Folders end with `/`.
    pub key: String,
    /// True only for zero-length trailing-slash keys on hierarchical backends.
    pub is_folder: bool,
    /// MIME type; empty when the backend has no such concept.
    pub content_type: String,
    /// Size in bytes.
    pub content_length: u64,
    /// Content fingerprint with surrounding quotes removed.
    pub etag: Option<String>,
    pub created_utc: Option<DateTime<Utc>>,
    pub last_update_utc: Option<DateTime<Utc>>,
    pub last_access_utc: Option<DateTime<Utc>>,
}

impl BlobMetadata {
    /// Metadata for a regular object.
    pub fn object(key: impl Into<String>, content_length: u64) -> Self {
        Self {
            key: key.into(),
            content_length,
            ..Default::default()
        }
    }

    /// Metadata for a folder. A trailing `/` is appended if missing.
    pub fn folder(key: impl Into<String>) -> Self {
        let mut key = key.into();
        if !key.ends_with('/') {
            key.push('/');
        }
        Self {
            key,
            is_folder: true,
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_etag(mut self, etag: Option<&str>) -> Self {
        self.etag = etag.map(normalize_etag);
        self
    }

    /// Set the content length from a signed size, rejecting negatives.
    pub fn set_content_length(&mut self, length: i64) -> Result<()> {
        self.content_length = u64::try_from(length).map_err(|_| {
            Error::InvalidArgument(format!("content length must be >= 0, got {}", length))
        })?;
        Ok(())
    }
}

impl PartialEq for BlobMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for BlobMetadata {}

impl Hash for BlobMetadata {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Strip surrounding quote characters from an etag.
pub fn normalize_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// Caller-supplied enumeration constraints.
///
/// Backends may narrow their native listing with the prefix, but every
/// returned item is checked against the whole filter again with [`matches`].
///
/// [`matches`]: EnumerationFilter::matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationFilter {
    pub minimum_size: u64,
    pub maximum_size: u64,
    #[serde(deserialize_with = "lowercase")]
    pub prefix: String,
    #[serde(deserialize_with = "lowercase")]
    pub suffix: String,
}

impl Default for EnumerationFilter {
    fn default() -> Self {
        Self {
            minimum_size: 0,
            maximum_size: i64::MAX as u64,
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

fn lowercase<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default().to_lowercase())
}

impl EnumerationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.prefix = prefix.as_ref().to_lowercase();
        self
    }

    pub fn with_suffix(mut self, suffix: impl AsRef<str>) -> Self {
        self.suffix = suffix.as_ref().to_lowercase();
        self
    }

    /// Constrain object sizes to `minimum..=maximum`.
    pub fn with_size_range(mut self, minimum: u64, maximum: u64) -> Result<Self> {
        self.minimum_size = minimum;
        self.maximum_size = maximum;
        self.validate()?;
        Ok(self)
    }

    /// Check the size bounds invariant.
    pub fn validate(&self) -> Result<()> {
        if self.maximum_size > i64::MAX as u64 {
            return Err(Error::InvalidArgument(format!(
                "maximum size {} exceeds {}",
                self.maximum_size,
                i64::MAX
            )));
        }
        if self.minimum_size > self.maximum_size {
            return Err(Error::InvalidArgument(format!(
                "minimum size {} is greater than maximum size {}",
                self.minimum_size, self.maximum_size
            )));
        }
        Ok(())
    }

    /// Client-side post-filter applied to every enumerated item.
    pub fn matches(&self, blob: &BlobMetadata) -> bool {
        if blob.content_length < self.minimum_size || blob.content_length > self.maximum_size {
            return false;
        }
        if self.prefix.is_empty() && self.suffix.is_empty() {
            return true;
        }
        let key = blob.key.to_lowercase();
        key.starts_with(&self.prefix) && key.ends_with(&self.suffix)
    }
}

/// One page of enumeration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumerationResult {
    pub blobs: Vec<BlobMetadata>,
    pub next_continuation_token: Option<String>,
}

impl EnumerationResult {
    pub fn new(blobs: Vec<BlobMetadata>, next_continuation_token: Option<String>) -> Self {
        Self {
            blobs,
            next_continuation_token: next_continuation_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_continuation_token
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }

    pub fn count(&self) -> usize {
        self.blobs.len()
    }

    pub fn bytes(&self) -> u64 {
        self.blobs.iter().map(|b| b.content_length).sum()
    }
}

/// Data carried by a [`WriteRequest`].
pub enum WriteSource {
    Data(Bytes),
    Stream {
        content_length: u64,
        stream: ByteStream,
    },
}

impl fmt::Debug for WriteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteSource::Data(data) => f.debug_tuple("Data").field(&data.len()).finish(),
            WriteSource::Stream { content_length, .. } => f
                .debug_struct("Stream")
                .field("content_length", content_length)
                .finish_non_exhaustive(),
        }
    }
}

/// A single queued write in a bulk-write batch.
#[derive(Debug)]
pub struct WriteRequest {
    pub key: String,
    pub content_type: String,
    pub source: WriteSource,
}

impl WriteRequest {
    pub fn from_bytes(
        key: impl Into<String>,
        content_type: impl AsRef<str>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: key.into(),
            content_type: content_type_or_default(content_type.as_ref()),
            source: WriteSource::Data(data.into()),
        }
    }

    pub fn from_stream(
        key: impl Into<String>,
        content_type: impl AsRef<str>,
        content_length: u64,
        stream: ByteStream,
    ) -> Self {
        Self {
            key: key.into(),
            content_type: content_type_or_default(content_type.as_ref()),
            source: WriteSource::Stream {
                content_length,
                stream,
            },
        }
    }

    pub fn content_length(&self) -> u64 {
        match &self.source {
            WriteSource::Data(data) => data.len() as u64,
            WriteSource::Stream { content_length, .. } => *content_length,
        }
    }
}

/// Resolve an empty content type to [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_or_default(content_type: &str) -> String {
    if content_type.trim().is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        content_type.to_string()
    }
}
