//! Copy engine orchestration.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{content_type_or_default, BlobMetadata, EnumerationFilter};
use crate::storage::StorageClient;
use crate::{Error, Result};

/// Caller-supplied sink for human-readable progress lines.
pub type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Wall-clock span of a run. `end` is set on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTime {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl RunTime {
    fn started() -> Self {
        Self {
            start: Utc::now(),
            end: None,
        }
    }

    fn finish(&mut self) {
        self.end = Some(Utc::now());
    }

    /// Elapsed time, once the run has finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end.map(|end| end - self.start)
    }
}

/// Outcome of a [`BlobCopy::start`] run.
#[derive(Debug)]
pub struct CopyStatistics {
    pub blobs_enumerated: u64,
    pub bytes_enumerated: u64,
    pub blobs_read: u64,
    pub bytes_read: u64,
    pub blobs_written: u64,
    pub bytes_written: u64,
    /// Keys written, in order
    pub keys: Vec<String>,
    pub time: RunTime,
    /// False only when a backend error stopped the run
    pub success: bool,
    pub error: Option<Error>,
    /// Token of the page in progress when the run stopped, `None` once the
    /// source is exhausted. Pass to [`BlobCopy::with_continuation_token`]
    /// to resume.
    pub continuation_token: Option<String>,
}

impl CopyStatistics {
    fn new() -> Self {
        Self {
            blobs_enumerated: 0,
            bytes_enumerated: 0,
            blobs_read: 0,
            bytes_read: 0,
            blobs_written: 0,
            bytes_written: 0,
            keys: Vec::new(),
            time: RunTime::started(),
            success: true,
            error: None,
            continuation_token: None,
        }
    }
}

impl fmt::Display for CopyStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "enumerated {} ({} bytes), read {} ({} bytes), written {} ({} bytes)",
            self.blobs_enumerated,
            self.bytes_enumerated,
            self.blobs_read,
            self.bytes_read,
            self.blobs_written,
            self.bytes_written
        )
    }
}

/// Outcome of draining a backend.
#[derive(Debug)]
pub struct EmptyResult {
    /// Items deleted, in deletion order
    pub blobs: Vec<BlobMetadata>,
    pub time: RunTime,
    pub success: bool,
    pub error: Option<Error>,
}

impl EmptyResult {
    pub fn count(&self) -> usize {
        self.blobs.len()
    }

    pub fn bytes(&self) -> u64 {
        self.blobs.iter().map(|b| b.content_length).sum()
    }
}

/// Why the copy loop stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Exhausted,
    Limit,
    Cancelled,
}

/// Copies blobs from a source backend to a destination backend.
///
/// Reads and writes are strictly sequential. Each object is buffered in
/// memory between the read and the write.
pub struct BlobCopy {
    source: Arc<dyn StorageClient>,
    destination: Arc<dyn StorageClient>,
    logger: Option<Logger>,
    continuation_token: Option<String>,
}

impl BlobCopy {
    pub fn new(source: Arc<dyn StorageClient>, destination: Arc<dyn StorageClient>) -> Self {
        Self {
            source,
            destination,
            logger: None,
            continuation_token: None,
        }
    }

    /// Receive progress lines in addition to `tracing` events.
    pub fn with_logger(mut self, logger: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Resume enumeration of the source at `token`.
    pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into()).filter(|t| !t.is_empty());
        self
    }

    fn report(&self, message: &str) {
        info!("{}", message);
        if let Some(logger) = &self.logger {
            logger(message);
        }
    }

    /// Copy every blob matching `filter` from source to destination.
    ///
    /// `stop_after` is `-1` for no limit or a positive number of blobs to
    /// write before stopping. Any other value is rejected before I/O; that
    /// is the only error this returns. Backend failures end the run and are
    /// reported through [`CopyStatistics::error`].
    pub async fn start(
        &self,
        stop_after: i64,
        filter: Option<EnumerationFilter>,
        cancel: &CancellationToken,
    ) -> Result<CopyStatistics> {
        if stop_after != -1 && stop_after <= 0 {
            return Err(Error::InvalidArgument(format!(
                "stop_after must be -1 or greater than 0, got {}",
                stop_after
            )));
        }
        let filter = filter.unwrap_or_default();
        filter.validate()?;
        let limit = u64::try_from(stop_after).ok();

        let mut stats = CopyStatistics::new();
        self.report(&format!(
            "Copying from {} to {}{}",
            self.source.name(),
            self.destination.name(),
            limit
                .map(|l| format!(" (stopping after {} blobs)", l))
                .unwrap_or_default()
        ));

        match self.copy_pages(&filter, limit, cancel, &mut stats).await {
            Ok(Stop::Exhausted) => self.report(&format!("Copy complete: {}", stats)),
            Ok(Stop::Limit) => self.report(&format!("Copy stopped after limit: {}", stats)),
            Ok(Stop::Cancelled) => self.report(&format!("Copy cancelled: {}", stats)),
            Err(e) => {
                warn!("Copy failed after {} blobs: {}", stats.blobs_written, e);
                if let Some(logger) = &self.logger {
                    logger(&format!("Copy failed: {}", e));
                }
                stats.success = false;
                stats.error = Some(e);
            }
        }

        stats.time.finish();
        Ok(stats)
    }

    async fn copy_pages(
        &self,
        filter: &EnumerationFilter,
        limit: Option<u64>,
        cancel: &CancellationToken,
        stats: &mut CopyStatistics,
    ) -> Result<Stop> {
        let mut token = self.continuation_token.clone();

        loop {
            stats.continuation_token = token.clone();
            if cancel.is_cancelled() {
                return Ok(Stop::Cancelled);
            }

            let page = self.source.enumerate(filter, token.as_deref()).await?;
            debug!(
                "Enumerated page of {} blobs from {} (more: {})",
                page.count(),
                self.source.name(),
                page.has_more()
            );
            let next = page.next_continuation_token;
            let page_len = page.blobs.len();

            for (index, blob) in page.blobs.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    return Ok(Stop::Cancelled);
                }

                stats.blobs_enumerated += 1;
                stats.bytes_enumerated += blob.content_length;

                let data = self.source.get(&blob.key).await?;
                stats.blobs_read += 1;
                stats.bytes_read += data.len() as u64;

                let length = data.len() as u64;
                self.destination
                    .write(&blob.key, &content_type_or_default(&blob.content_type), data)
                    .await?;
                stats.blobs_written += 1;
                stats.bytes_written += length;
                stats.keys.push(blob.key.clone());

                if let Some(logger) = &self.logger {
                    logger(&format!("Copied {} ({} bytes)", blob.key, length));
                }
                debug!("Copied {} ({} bytes)", blob.key, length);

                if limit.is_some_and(|l| stats.blobs_written >= l) {
                    if index + 1 == page_len {
                        stats.continuation_token = next;
                    }
                    return Ok(Stop::Limit);
                }
            }

            match next {
                Some(next) => token = Some(next),
                None => {
                    stats.continuation_token = None;
                    return Ok(Stop::Exhausted);
                }
            }
        }
    }

    /// Delete everything in the destination.
    pub async fn empty(&self, cancel: &CancellationToken) -> EmptyResult {
        drain(self.destination.as_ref(), cancel, self.logger.as_ref()).await
    }
}

/// Delete every blob in `client`.
///
/// Backend failures end the drain and are reported through
/// [`EmptyResult::error`].
pub async fn empty(client: &dyn StorageClient, cancel: &CancellationToken) -> EmptyResult {
    drain(client, cancel, None).await
}

async fn drain(
    client: &dyn StorageClient,
    cancel: &CancellationToken,
    logger: Option<&Logger>,
) -> EmptyResult {
    let mut result = EmptyResult {
        blobs: Vec::new(),
        time: RunTime::started(),
        success: true,
        error: None,
    };

    info!("Emptying {}", client.name());
    if let Err(e) = drain_pages(client, cancel, logger, &mut result.blobs).await {
        warn!(
            "Emptying {} failed after {} deletions: {}",
            client.name(),
            result.blobs.len(),
            e
        );
        if let Some(logger) = logger {
            logger(&format!("Empty failed: {}", e));
        }
        result.success = false;
        result.error = Some(e);
    } else {
        info!(
            "Emptied {}: {} blobs ({} bytes)",
            client.name(),
            result.count(),
            result.bytes()
        );
    }

    result.time.finish();
    result
}

async fn drain_pages(
    client: &dyn StorageClient,
    cancel: &CancellationToken,
    logger: Option<&Logger>,
    deleted: &mut Vec<BlobMetadata>,
) -> Result<()> {
    let filter = EnumerationFilter::default();
    let mut seen = HashSet::new();

    // Deleting shifts every later item, so always re-read the first page.
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let page = client.enumerate(&filter, None).await?;
        if page.blobs.is_empty() {
            return Ok(());
        }
        if page.blobs.iter().all(|b| seen.contains(&b.key)) {
            return Err(Error::backend(format!(
                "{} still lists deleted keys, drain made no progress",
                client.name()
            )));
        }

        for blob in page.blobs {
            if cancel.is_cancelled() {
                return Ok(());
            }
            client.delete(&blob.key).await?;
            debug!("Deleted {} from {}", blob.key, client.name());
            if let Some(logger) = logger {
                logger(&format!("Deleted {}", blob.key));
            }
            seen.insert(blob.key.clone());
            deleted.push(blob);
        }
    }
}
