//! Shared implementation for flat object stores reached through
//! `object_store` (S3, Azure Blob, GCS, in-memory).
//!
//! These stores page natively: the continuation token is the location of
//! the last yielded object and the next page resumes strictly after it.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, WriteMultipart,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::{is_folder_key, require_key, BackendKind, BlobStream, DEFAULT_PAGE_SIZE};
use super::filter::{join_key, native_base};
use super::StorageClient;
use crate::model::{
    content_type_or_default, BlobMetadata, ByteStream, EnumerationFilter, EnumerationResult,
};
use crate::{Error, Result};

/// Multipart parts allowed in flight during a streaming write.
const MULTIPART_CONCURRENCY: usize = 4;

/// A flat object store behind the [`StorageClient`] contract.
pub struct ObjectStoreBackend {
    name: &'static str,
    label: &'static str,
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
    url_base: String,
    page_size: usize,
}

impl ObjectStoreBackend {
    /// Wrap an object store.
    ///
    /// `name` is the short backend name, `label` its display form used in
    /// error messages, `url_base` the locator keys are appended to.
    pub fn new(
        name: &'static str,
        label: &'static str,
        store: Arc<dyn ObjectStore>,
        prefix: Option<String>,
        url_base: impl Into<String>,
    ) -> Self {
        Self {
            name,
            label,
            store,
            prefix: prefix
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            url_base: url_base.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub(crate) fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    /// Build the full path for a key.
    ///
    /// Keys map to locations verbatim so that listings hand back the key that
    /// was written. Keys the store cannot represent are rejected.
    fn full_path(&self, key: &str) -> Result<Path> {
        let raw = match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        };
        Path::parse(&raw).map_err(|e| {
            Error::InvalidArgument(format!(
                "key '{}' is not a valid {} location: {}",
                key, self.label, e
            ))
        })
    }

    /// Strip the configured prefix from a location to get the key
    fn strip_prefix(&self, location: &str) -> String {
        match &self.prefix {
            Some(p) => location
                .strip_prefix(&format!("{}/", p))
                .unwrap_or(location)
                .to_string(),
            None => location.to_string(),
        }
    }

    /// Native listing root for an enumeration prefix.
    ///
    /// A base the store cannot represent holds no keys, so the listing falls
    /// back to the configured root and the post-filter decides.
    fn list_root(&self, filter: &EnumerationFilter) -> Result<Option<Path>> {
        let base = native_base(&filter.prefix);
        if !base.is_empty() {
            if let Ok(path) = self.full_path(base) {
                return Ok(Some(path));
            }
        }
        self.prefix
            .as_deref()
            .map(|prefix| {
                Path::parse(prefix).map_err(|e| {
                    Error::Config(format!("invalid {} prefix '{}': {}", self.label, prefix, e))
                })
            })
            .transpose()
    }

    fn map_error(&self, operation: &str, key: &str, e: object_store::Error) -> Error {
        match e {
            object_store::Error::NotFound { .. } => Error::not_found(key),
            _ => Error::backend(format!("{} {} failed: {}", self.label, operation, e)),
        }
    }

    fn to_metadata(&self, meta: &ObjectMeta, attributes: Option<&Attributes>) -> BlobMetadata {
        let content_type = attributes
            .and_then(|a| a.get(&Attribute::ContentType))
            .map(|v| v.to_string())
            .unwrap_or_default();

        let mut blob = BlobMetadata::object(
            self.strip_prefix(meta.location.as_ref()),
            meta.size as u64,
        )
        .with_content_type(content_type)
        .with_etag(meta.e_tag.as_deref());
        blob.last_update_utc = Some(meta.last_modified);
        blob
    }

    fn attributes(content_type: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type_or_default(content_type)),
        );
        attributes
    }

    /// Flat stores have no folder objects. Folder keys never resolve.
    fn reject_folder_key(&self, key: &str) -> Result<()> {
        if is_folder_key(key) {
            return Err(Error::not_found(key));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageClient for ObjectStoreBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        require_key(key)?;
        self.reject_folder_key(key)?;
        let path = self.full_path(key)?;
        debug!("{} GET: {}", self.label, path);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| self.map_error("GET", key, e))?;

        result.bytes().await.map_err(|e| {
            Error::backend(format!("Failed to read {} response: {}", self.label, e))
        })
    }

    async fn get_stream(&self, key: &str) -> Result<BlobStream> {
        require_key(key)?;
        self.reject_folder_key(key)?;
        let path = self.full_path(key)?;
        debug!("{} GET (stream): {}", self.label, path);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| self.map_error("GET", key, e))?;

        let label = self.label;
        let content_length = result.meta.size as u64;
        let stream = result
            .into_stream()
            .map_err(move |e| Error::backend(format!("Failed to read {} stream: {}", label, e)))
            .boxed();

        Ok(BlobStream {
            content_length,
            stream,
        })
    }

    async fn get_metadata(&self, key: &str) -> Result<BlobMetadata> {
        require_key(key)?;
        self.reject_folder_key(key)?;
        let path = self.full_path(key)?;
        debug!("{} HEAD: {}", self.label, path);

        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&path, options)
            .await
            .map_err(|e| self.map_error("HEAD", key, e))?;

        Ok(self.to_metadata(&result.meta, Some(&result.attributes)))
    }

    async fn write(&self, key: &str, content_type: &str, data: Bytes) -> Result<()> {
        require_key(key)?;
        if is_folder_key(key) {
            if !data.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "folder key {} cannot carry data",
                    key
                )));
            }
            debug!("{} PUT: skipping folder marker {}", self.label, key);
            return Ok(());
        }

        let path = self.full_path(key)?;
        debug!("{} PUT: {} ({} bytes)", self.label, path, data.len());

        let mut options = PutOptions::default();
        options.attributes = Self::attributes(content_type);
        self.store
            .put_opts(&path, PutPayload::from_bytes(data), options)
            .await
            .map_err(|e| self.map_error("PUT", key, e))?;

        Ok(())
    }

    async fn write_stream(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
        mut stream: ByteStream,
    ) -> Result<()> {
        require_key(key)?;
        if is_folder_key(key) {
            return self.write(key, content_type, Bytes::new()).await;
        }

        let path = self.full_path(key)?;
        debug!("{} PUT (multipart): {}", self.label, path);

        let mut options = PutMultipartOpts::default();
        options.attributes = Self::attributes(content_type);
        let upload = self
            .store
            .put_multipart_opts(&path, options)
            .await
            .map_err(|e| self.map_error("PUT", key, e))?;

        let mut writer = WriteMultipart::new(upload);
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    if let Err(abort) = writer.abort().await {
                        warn!("{} multipart abort failed for {}: {}", self.label, path, abort);
                    }
                    return Err(e);
                }
            };
            writer
                .wait_for_capacity(MULTIPART_CONCURRENCY)
                .await
                .map_err(|e| self.map_error("PUT", key, e))?;
            written += chunk.len() as u64;
            writer.write(&chunk);
        }
        writer
            .finish()
            .await
            .map_err(|e| self.map_error("PUT", key, e))?;

        if written != content_length {
            warn!(
                "{} PUT {}: declared {} bytes but stream produced {}",
                self.label, key, content_length, written
            );
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        require_key(key)?;
        self.reject_folder_key(key)?;
        let path = self.full_path(key)?;
        debug!("{} DELETE: {}", self.label, path);

        // Most stores treat deletes as idempotent; the contract does not.
        self.store
            .head(&path)
            .await
            .map_err(|e| self.map_error("HEAD", key, e))?;

        self.store
            .delete(&path)
            .await
            .map_err(|e| self.map_error("DELETE", key, e))?;

        Ok(())
    }

    fn generate_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        let full = match &self.prefix {
            Some(prefix) => join_key(prefix, key),
            None => key.to_string(),
        };
        if self.url_base.ends_with('/') {
            format!("{}{}", self.url_base, full)
        } else {
            format!("{}/{}", self.url_base, full)
        }
    }

    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
        continuation_token: Option<&str>,
    ) -> Result<EnumerationResult> {
        filter.validate()?;
        let root = self.list_root(filter)?;
        debug!(
            "{} LIST: root={:?}, marker={:?}",
            self.label, root, continuation_token
        );

        let mut stream = match continuation_token.filter(|t| !t.is_empty()) {
            Some(marker) => {
                let offset = Path::parse(marker).map_err(|e| {
                    Error::InvalidArgument(format!(
                        "unparsable continuation token '{}': {}",
                        marker, e
                    ))
                })?;
                self.store.list_with_offset(root.as_ref(), &offset)
            }
            None => self.store.list(root.as_ref()),
        };

        let mut blobs = Vec::new();
        let mut last_location: Option<String> = None;
        let mut has_more = false;

        while let Some(result) = stream.next().await {
            let meta = result.map_err(|e| self.map_error("LIST", &filter.prefix, e))?;
            let blob = self.to_metadata(&meta, None);
            if !filter.matches(&blob) {
                continue;
            }
            if blobs.len() == self.page_size {
                has_more = true;
                break;
            }
            last_location = Some(meta.location.to_string());
            blobs.push(blob);
        }

        let next = if has_more { last_location } else { None };
        Ok(EnumerationResult::new(blobs, next))
    }
}

/// Forward the [`StorageClient`] contract of a wrapper type to its
/// `inner: ObjectStoreBackend` field.
macro_rules! delegate_object_store {
    ($ty:ty) => {
        impl $ty {
            /// Set the number of items returned per enumeration page.
            pub fn with_page_size(mut self, page_size: usize) -> Self {
                self.inner.set_page_size(page_size);
                self
            }
        }

        #[async_trait::async_trait]
        impl $crate::storage::StorageClient for $ty {
            fn name(&self) -> &str {
                $crate::storage::StorageClient::name(&self.inner)
            }

            fn kind(&self) -> $crate::storage::BackendKind {
                $crate::storage::StorageClient::kind(&self.inner)
            }

            async fn get(&self, key: &str) -> $crate::Result<bytes::Bytes> {
                $crate::storage::StorageClient::get(&self.inner, key).await
            }

            async fn get_stream(&self, key: &str) -> $crate::Result<$crate::storage::BlobStream> {
                $crate::storage::StorageClient::get_stream(&self.inner, key).await
            }

            async fn get_metadata(&self, key: &str) -> $crate::Result<$crate::model::BlobMetadata> {
                $crate::storage::StorageClient::get_metadata(&self.inner, key).await
            }

            async fn write(
                &self,
                key: &str,
                content_type: &str,
                data: bytes::Bytes,
            ) -> $crate::Result<()> {
                $crate::storage::StorageClient::write(&self.inner, key, content_type, data).await
            }

            async fn write_stream(
                &self,
                key: &str,
                content_type: &str,
                content_length: u64,
                stream: $crate::model::ByteStream,
            ) -> $crate::Result<()> {
                $crate::storage::StorageClient::write_stream(&self.inner, key, content_type, content_length, stream)
                    .await
            }

            async fn delete(&self, key: &str) -> $crate::Result<()> {
                $crate::storage::StorageClient::delete(&self.inner, key).await
            }

            fn generate_url(&self, key: &str) -> String {
                $crate::storage::StorageClient::generate_url(&self.inner, key)
            }

            async fn enumerate(
                &self,
                filter: &$crate::model::EnumerationFilter,
                continuation_token: Option<&str>,
            ) -> $crate::Result<$crate::model::EnumerationResult> {
                $crate::storage::StorageClient::enumerate(&self.inner, filter, continuation_token).await
            }
        }
    };
}

pub(crate) use delegate_object_store;
