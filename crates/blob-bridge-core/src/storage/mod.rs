//! Storage contract and backend implementations.
//!
//! This module provides a unified interface for storing, reading,
//! enumerating and deleting blobs across multiple storage backends:
//!
//! - **S3**: AWS S3 and S3-compatible services (MinIO, Ceph RGW, etc.)
//! - **Azure**: Azure Blob Storage
//! - **GCS**: Google Cloud Storage
//! - **Filesystem**: Local filesystem storage
//! - **Memory**: In-memory storage (for testing)
//!
//! Enumeration is paged. Each call returns at most one page plus an opaque
//! continuation token; object stores pass their native marker through,
//! the filesystem encodes an offset/count pair (see [`token`]).

mod azure;
mod client;
mod config;
mod enumeration;
mod filesystem;
pub mod filter;
mod gcs;
mod memory;
mod object;
mod s3;
pub mod token;

pub use azure::{AzureBackend, AzureConfig};
pub use client::{BackendKind, BlobStream, StorageClient, DEFAULT_PAGE_SIZE};
pub use config::StorageBackendConfig;
pub use enumeration::{enumerate_all, list_all};
pub use filesystem::FilesystemBackend;
pub use gcs::{GcsBackend, GcsConfig};
pub use memory::MemoryBackend;
pub use object::ObjectStoreBackend;
pub use s3::{S3Backend, S3Config};

use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Create a storage backend from configuration.
///
/// # Example
///
/// ```rust,ignore
/// use blob_bridge_core::storage::{create_backend, StorageBackendConfig};
///
/// let config = StorageBackendConfig::from_url("file:///var/blobs")?;
/// let backend = create_backend(&config)?;
/// ```
pub fn create_backend(config: &StorageBackendConfig) -> Result<Arc<dyn StorageClient>> {
    config.validate()?;
    let page_size = config.page_size().unwrap_or(DEFAULT_PAGE_SIZE);

    let backend: Arc<dyn StorageClient> = match config {
        StorageBackendConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
            prefix,
            path_style,
            allow_http,
            ..
        } => {
            let s3_config = S3Config {
                bucket: bucket.clone(),
                region: region.clone().or_else(|| S3Config::default().region),
                endpoint: endpoint.clone(),
                access_key_id: access_key.clone(),
                secret_access_key: secret_key.clone(),
                prefix: prefix.clone(),
                path_style: *path_style,
                allow_http: *allow_http,
            };
            Arc::new(S3Backend::new(s3_config)?.with_page_size(page_size))
        }

        StorageBackendConfig::Azure {
            account_name,
            container_name,
            account_key,
            prefix,
            endpoint,
            client_id,
            tenant_id,
            client_secret,
            sas_token,
            ..
        } => {
            let azure_config = AzureConfig {
                account_name: account_name.clone(),
                container_name: container_name.clone(),
                account_key: account_key.clone(),
                prefix: prefix.clone(),
                endpoint: endpoint.clone(),
                client_id: client_id.clone(),
                tenant_id: tenant_id.clone(),
                client_secret: client_secret.clone(),
                sas_token: sas_token.clone(),
            };
            Arc::new(AzureBackend::new(azure_config)?.with_page_size(page_size))
        }

        StorageBackendConfig::Gcs {
            bucket,
            service_account_path,
            prefix,
            ..
        } => {
            let gcs_config = GcsConfig {
                bucket: bucket.clone(),
                service_account_path: service_account_path.clone(),
                prefix: prefix.clone(),
            };
            Arc::new(GcsBackend::new(gcs_config)?.with_page_size(page_size))
        }

        StorageBackendConfig::Filesystem { path, .. } => {
            Arc::new(FilesystemBackend::new(path.clone()).with_page_size(page_size))
        }

        StorageBackendConfig::Memory { .. } => {
            Arc::new(MemoryBackend::new().with_page_size(page_size))
        }
    };

    debug!(
        "Created {} storage backend (page size {})",
        backend.name(),
        page_size
    );
    Ok(backend)
}

/// Parse a storage URL and create the backend it names.
pub fn create_backend_from_url(url: &str) -> Result<Arc<dyn StorageClient>> {
    create_backend(&StorageBackendConfig::from_url(url)?)
}
