//! Google Cloud Storage backend implementation.

use object_store::gcp::GoogleCloudStorageBuilder;
use std::sync::Arc;
use tracing::info;

use super::object::{delegate_object_store, ObjectStoreBackend};
use crate::{Error, Result};

/// Public endpoint GCS objects are addressed under
const GCS_URL_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Storage backend configuration
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// GCS bucket name
    pub bucket: String,
    /// Path to service account JSON key file (if None, uses Application Default Credentials)
    pub service_account_path: Option<String>,
    /// Key prefix for all operations
    pub prefix: Option<String>,
}

/// Google Cloud Storage backend
pub struct GcsBackend {
    inner: ObjectStoreBackend,
}

impl GcsBackend {
    /// Create a new Google Cloud Storage backend
    ///
    /// If `service_account_path` is not provided, the SDK will attempt to use
    /// Application Default Credentials.
    pub fn new(config: GcsConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::Config("GCS bucket is required".to_string()));
        }

        let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(&config.bucket);

        if let Some(path) = &config.service_account_path {
            builder = builder.with_service_account_path(path);
        }

        let store = builder
            .build()
            .map_err(|e| Error::backend(format!("Failed to create GCS client: {}", e)))?;

        info!(
            "Created GCS backend for bucket: {}, prefix: {:?}",
            config.bucket, config.prefix
        );

        let url_base = format!("{}/{}", GCS_URL_BASE, config.bucket);
        Ok(Self {
            inner: ObjectStoreBackend::new("gcs", "GCS", Arc::new(store), config.prefix, url_base),
        })
    }
}

delegate_object_store!(GcsBackend);
