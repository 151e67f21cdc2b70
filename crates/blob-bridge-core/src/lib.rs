//! Blob Bridge Core Library
//!
//! This crate provides a provider-agnostic blob storage contract, a paged
//! enumeration protocol shared by every backend, and an engine that copies
//! or drains objects across backends.

pub mod config;
pub mod copy;
pub mod error;
pub mod metrics;
pub mod model;
pub mod storage;

pub use config::CopyJobConfig;
pub use copy::{empty, BlobCopy, CopyStatistics, EmptyResult, Logger, RunTime};
pub use error::{Error, Result, StorageError};
pub use metrics::{instrument, InstrumentedStorageClient, StorageMetrics};
pub use model::{
    BlobMetadata, ByteStream, EnumerationFilter, EnumerationResult, WriteRequest, WriteSource,
    DEFAULT_CONTENT_TYPE,
};
pub use storage::{
    create_backend, create_backend_from_url, BackendKind, StorageBackendConfig, StorageClient,
};
