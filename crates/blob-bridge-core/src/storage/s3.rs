//! S3-compatible storage backend using object_store.

use object_store::aws::AmazonS3Builder;
use std::sync::Arc;
use tracing::info;

use super::object::{delegate_object_store, ObjectStoreBackend};
use crate::{Error, Result};

/// S3 storage backend configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: Option<String>,
    /// Custom endpoint (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Key prefix for all operations
    pub prefix: Option<String>,
    /// Use path-style requests
    pub path_style: bool,
    /// Allow HTTP (insecure) connections
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: Some("us-east-1".to_string()),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            prefix: None,
            path_style: false,
            allow_http: false,
        }
    }
}

impl S3Config {
    /// Base URL objects in this bucket are addressed under
    pub fn url_base(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => {
                let region = self.region.as_deref().unwrap_or("us-east-1");
                format!("https://{}.s3.{}.amazonaws.com", self.bucket, region)
            }
        }
    }
}

/// S3 storage backend
pub struct S3Backend {
    inner: ObjectStoreBackend,
}

impl S3Backend {
    /// Create a new S3 backend
    pub fn new(config: S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::Config("S3 bucket is required".to_string()));
        }

        let mut builder = AmazonS3Builder::new().with_bucket_name(&config.bucket);

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        if config.path_style || config.endpoint.is_some() {
            builder = builder.with_virtual_hosted_style_request(false);
        }

        if let Some(access_key) = &config.access_key_id {
            builder = builder.with_access_key_id(access_key);
        }

        if let Some(secret_key) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::backend(format!("Failed to create S3 client: {}", e)))?;

        info!(
            "Created S3 backend for bucket: {}, prefix: {:?}",
            config.bucket, config.prefix
        );

        let url_base = config.url_base();
        Ok(Self {
            inner: ObjectStoreBackend::new("s3", "S3", Arc::new(store), config.prefix, url_base),
        })
    }
}

delegate_object_store!(S3Backend);
