//! Filesystem storage backend implementation.
//!
//! The local disk is the hierarchical backend: folders are addressable,
//! contentless entries whose keys end in `/`. Listing is a directory walk
//! with no native cursor, so pages are addressed with synthetic
//! offset/count tokens over the sorted, filtered walk.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::client::{is_folder_key, require_key, BackendKind, BlobStream, DEFAULT_PAGE_SIZE};
use super::filter::native_base;
use super::token::{self, OffsetCursor};
use super::StorageClient;
use crate::error::StorageError;
use crate::model::{BlobMetadata, ByteStream, EnumerationFilter, EnumerationResult};
use crate::{Error, Result};

/// Pending work in the post-order directory walk.
enum Pending {
    Expand(PathBuf),
    Emit(BlobMetadata),
}

/// Filesystem-based storage backend
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
    page_size: usize,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base path
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of items returned per enumeration page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Convert a storage key to a filesystem path
    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        let normalized = key.trim_matches('/');
        let relative = Path::new(normalized);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidPath(key.to_string()).into());
        }
        Ok(self.base_path.join(relative))
    }

    /// Convert a filesystem path to a storage key
    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn io_error(&self, operation: &str, key: &str, path: &Path, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(key)
        } else {
            Error::backend(format!(
                "Failed to {} {}: {}",
                operation,
                path.display(),
                e
            ))
        }
    }

    /// Stat a key, enforcing that folder keys resolve to directories.
    async fn stat(&self, key: &str) -> Result<(PathBuf, std::fs::Metadata)> {
        require_key(key)?;
        let path = self.key_to_path(key)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| self.io_error("stat", key, &path, e))?;
        if is_folder_key(key) && !metadata.is_dir() {
            return Err(Error::not_found(key));
        }
        Ok((path, metadata))
    }

    fn to_metadata(key: &str, metadata: &std::fs::Metadata) -> BlobMetadata {
        let mut blob = if metadata.is_dir() {
            BlobMetadata::folder(key.trim_end_matches('/'))
        } else {
            BlobMetadata::object(key, metadata.len())
        };
        blob.created_utc = metadata.created().ok().map(DateTime::<Utc>::from);
        blob.last_update_utc = metadata.modified().ok().map(DateTime::<Utc>::from);
        blob.last_access_utc = metadata.accessed().ok().map(DateTime::<Utc>::from);
        blob
    }

    async fn create_parent(&self, key: &str, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error("create directories for", key, parent, e))?;
        }
        Ok(())
    }

    /// Sorted children of a directory with their metadata.
    ///
    /// Symlinks to files resolve to their target. Symlinked directories are
    /// skipped so a link back to an ancestor cannot recurse.
    async fn read_children(&self, dir: &Path) -> Result<Vec<(PathBuf, std::fs::Metadata)>> {
        let mut entries = fs::read_dir(dir).await.map_err(|e| {
            StorageError::Backend(format!("Failed to read directory {}: {}", dir.display(), e))
        })?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            StorageError::Backend(format!("Failed to read directory entry: {}", e))
        })? {
            let path = entry.path();
            let metadata = match fs::symlink_metadata(&path).await {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    match fs::metadata(&path).await {
                        Ok(target) if target.is_dir() => {
                            debug!("Skipping symlinked directory {}", path.display());
                            continue;
                        }
                        other => other,
                    }
                }
                other => other,
            };
            match metadata {
                Ok(metadata) => children.push((path, metadata)),
                Err(e) => debug!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }
        children.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));
        Ok(children)
    }

    /// Walk the tree below the filter's base directory, yielding every
    /// matching entry with folders after their descendants.
    async fn walk(&self, filter: &EnumerationFilter) -> Result<Vec<BlobMetadata>> {
        let mut results = Vec::new();
        if !fs::try_exists(&self.base_path).await.unwrap_or(false) {
            return Ok(results);
        }

        let base = native_base(&filter.prefix);
        let narrowed = match self.key_to_path(base) {
            Ok(path) if !base.is_empty() => match fs::symlink_metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => Some((path, metadata)),
                _ => None,
            },
            _ => None,
        };

        let mut stack = Vec::new();
        let root = match narrowed {
            Some((dir, metadata)) => {
                stack.push(Pending::Emit(Self::to_metadata(base, &metadata)));
                dir
            }
            None => self.base_path.clone(),
        };
        stack.push(Pending::Expand(root));

        while let Some(pending) = stack.pop() {
            match pending {
                Pending::Emit(blob) => {
                    if filter.matches(&blob) {
                        results.push(blob);
                    }
                }
                Pending::Expand(dir) => {
                    // Reversed so the first child is popped first.
                    for (path, metadata) in self.read_children(&dir).await?.into_iter().rev() {
                        let Some(key) = self.path_to_key(&path) else {
                            continue;
                        };
                        stack.push(Pending::Emit(Self::to_metadata(&key, &metadata)));
                        if metadata.is_dir() {
                            stack.push(Pending::Expand(path));
                        }
                    }
                }
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl StorageClient for FilesystemBackend {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::HierarchicalFilesystem
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let (path, metadata) = self.stat(key).await?;
        debug!("Filesystem GET: {}", path.display());
        if metadata.is_dir() {
            return Ok(Bytes::new());
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| self.io_error("read file", key, &path, e))?;
        Ok(Bytes::from(data))
    }

    async fn get_stream(&self, key: &str) -> Result<BlobStream> {
        let (path, metadata) = self.stat(key).await?;
        debug!("Filesystem GET (stream): {}", path.display());
        if metadata.is_dir() {
            return Ok(BlobStream {
                content_length: 0,
                stream: futures::stream::empty::<Result<Bytes>>().boxed(),
            });
        }

        let file = fs::File::open(&path)
            .await
            .map_err(|e| self.io_error("open file", key, &path, e))?;
        Ok(BlobStream {
            content_length: metadata.len(),
            stream: ReaderStream::new(file).map_err(Error::from).boxed(),
        })
    }

    async fn get_metadata(&self, key: &str) -> Result<BlobMetadata> {
        let (path, metadata) = self.stat(key).await?;
        let key = self.path_to_key(&path).unwrap_or_else(|| key.to_string());
        Ok(Self::to_metadata(&key, &metadata))
    }

    async fn write(&self, key: &str, content_type: &str, data: Bytes) -> Result<()> {
        require_key(key)?;
        let path = self.key_to_path(key)?;

        if is_folder_key(key) {
            if !data.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "folder key {} cannot carry data",
                    key
                )));
            }
            debug!("Filesystem MKDIR: {}", path.display());
            fs::create_dir_all(&path)
                .await
                .map_err(|e| self.io_error("create directory", key, &path, e))?;
            return Ok(());
        }

        debug!(
            "Filesystem PUT: {} ({} bytes, content type '{}' not persisted)",
            path.display(),
            data.len(),
            content_type
        );
        self.create_parent(key, &path).await?;

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| self.io_error("create file", key, &path, e))?;
        file.write_all(&data)
            .await
            .map_err(|e| self.io_error("write to file", key, &path, e))?;
        file.flush()
            .await
            .map_err(|e| self.io_error("flush file", key, &path, e))?;

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

        let path = self.key_to_path(key)?;
        debug!("Filesystem PUT (stream): {}", path.display());
        self.create_parent(key, &path).await?;

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| self.io_error("create file", key, &path, e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(&path).await {
                        warn!("Failed to remove partial file {}: {}", path.display(), cleanup);
                    }
                    return Err(e);
                }
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| self.io_error("write to file", key, &path, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| self.io_error("flush file", key, &path, e))?;

        if written != content_length {
            warn!(
                "Filesystem PUT {}: declared {} bytes but stream produced {}",
                key, content_length, written
            );
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (path, metadata) = self.stat(key).await?;
        debug!("Filesystem DELETE: {}", path.display());

        if metadata.is_dir() {
            let mut entries = fs::read_dir(&path)
                .await
                .map_err(|e| self.io_error("read directory", key, &path, e))?;
            let has_children = entries
                .next_entry()
                .await
                .map_err(|e| self.io_error("read directory", key, &path, e))?
                .is_some();
            if has_children {
                return Err(StorageError::DirectoryNotEmpty(key.to_string()).into());
            }
            fs::remove_dir(&path)
                .await
                .map_err(|e| self.io_error("delete directory", key, &path, e))?;
        } else {
            fs::remove_file(&path)
                .await
                .map_err(|e| self.io_error("delete file", key, &path, e))?;
        }

        Ok(())
    }

    fn generate_url(&self, key: &str) -> String {
        let path = self.base_path.join(key.trim_start_matches('/'));
        let path = path.to_string_lossy();
        if path.starts_with('/') {
            format!("file://{}", path)
        } else {
            format!("file:///{}", path)
        }
    }

    async fn enumerate(
        &self,
        filter: &EnumerationFilter,
        continuation_token: Option<&str>,
    ) -> Result<EnumerationResult> {
        filter.validate()?;
        let cursor = match continuation_token.filter(|t| !t.is_empty()) {
            Some(token) => token::decode(token)?,
            None => OffsetCursor::new(0, self.page_size as u64),
        };

        let items = self.walk(filter).await?;
        let total = items.len() as u64;
        debug!(
            "Filesystem LIST: {} matching, page start={} count={}",
            total, cursor.start, cursor.count
        );

        let start = usize::try_from(cursor.start).unwrap_or(usize::MAX);
        let count = usize::try_from(cursor.count).unwrap_or(usize::MAX);
        let blobs: Vec<BlobMetadata> = items.into_iter().skip(start).take(count).collect();

        Ok(EnumerationResult::new(blobs, cursor.next(total)))
    }
}
