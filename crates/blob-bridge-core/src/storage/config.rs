//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend configuration using tagged enum for type-safe configuration.
///
/// Supports multiple storage backends:
/// - S3 and S3-compatible (MinIO, Ceph RGW, etc.)
/// - Azure Blob Storage
/// - Google Cloud Storage
/// - Local filesystem
/// - In-memory (for testing)
///
/// Every variant accepts an optional `page_size` bounding how many items
/// one enumeration call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend")]
pub enum StorageBackendConfig {
    /// AWS S3 or S3-compatible storage (MinIO, Ceph RGW, DigitalOcean Spaces, etc.)
    #[serde(rename = "s3")]
    S3 {
        /// S3 bucket name
        bucket: String,
        /// AWS region (e.g., "us-east-1")
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint URL (for S3-compatible services like MinIO)
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key ID (falls back to AWS_ACCESS_KEY_ID env var)
        #[serde(default)]
        access_key: Option<String>,
        /// Secret access key (falls back to AWS_SECRET_ACCESS_KEY env var)
        #[serde(default)]
        secret_key: Option<String>,
        /// Key prefix for all operations
        #[serde(default)]
        prefix: Option<String>,
        /// Use path-style requests (required for MinIO/Ceph RGW)
        #[serde(default)]
        path_style: bool,
        /// Allow HTTP (insecure) connections
        #[serde(default)]
        allow_http: bool,
        #[serde(default)]
        page_size: Option<usize>,
    },

    /// Azure Blob Storage
    #[serde(rename = "azure")]
    Azure {
        /// Azure storage account name
        account_name: String,
        /// Azure blob container name
        container_name: String,
        /// Storage account key (if None, uses the default credential chain)
        #[serde(default)]
        account_key: Option<String>,
        /// Key prefix for all operations
        #[serde(default)]
        prefix: Option<String>,
        /// Custom endpoint URL (sovereign clouds, Azurite)
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        client_id: Option<String>,
        #[serde(default)]
        tenant_id: Option<String>,
        #[serde(default)]
        client_secret: Option<String>,
        /// Shared access signature query string
        #[serde(default)]
        sas_token: Option<String>,
        #[serde(default)]
        page_size: Option<usize>,
    },

    /// Google Cloud Storage
    #[serde(rename = "gcs")]
    Gcs {
        /// GCS bucket name
        bucket: String,
        /// Path to service account JSON key file (if None, uses Application Default Credentials)
        #[serde(default)]
        service_account_path: Option<String>,
        /// Key prefix for all operations
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        page_size: Option<usize>,
    },

    /// Local filesystem storage
    #[serde(rename = "filesystem")]
    Filesystem {
        /// Base path for storage
        path: PathBuf,
        #[serde(default)]
        page_size: Option<usize>,
    },

    /// In-memory storage (for testing)
    #[serde(rename = "memory")]
    Memory {
        #[serde(default)]
        page_size: Option<usize>,
    },
}

impl StorageBackendConfig {
    /// Parse configuration from a URL string
    ///
    /// Supported URL formats:
    /// - `s3://bucket-name/optional/prefix?region=us-east-1`
    /// - `azure://container@account.blob.core.windows.net`
    /// - `gcs://bucket-name/optional/prefix`
    /// - `file:///path/to/data`
    /// - `memory://`
    ///
    /// A `page_size` query parameter is honoured by every scheme.
    pub fn from_url(url: &str) -> crate::Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| crate::Error::Config(format!("Invalid storage URL: {}", e)))?;

        let query = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.to_string())
        };
        let page_size = match query("page_size") {
            Some(value) => Some(value.parse::<usize>().map_err(|e| {
                crate::Error::Config(format!("Invalid page_size '{}': {}", value, e))
            })?),
            None => None,
        };
        let path_prefix = {
            let path = parsed.path().trim_matches('/');
            (!path.is_empty()).then(|| path.to_string())
        };

        match parsed.scheme() {
            "s3" | "s3a" => {
                let bucket = parsed.host_str().unwrap_or_default().to_string();
                let endpoint = query("endpoint");
                let allow_http = endpoint
                    .as_deref()
                    .is_some_and(|e| e.starts_with("http://"));

                Ok(Self::S3 {
                    bucket,
                    region: query("region"),
                    endpoint,
                    access_key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
                    secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
                    prefix: path_prefix,
                    path_style: query("path_style").is_some_and(|v| v == "true"),
                    allow_http,
                    page_size,
                })
            }
            "azure" | "az" => {
                let host = parsed.host_str().unwrap_or_default();
                let account_name = host.split('.').next().unwrap_or(host).to_string();
                // container@account form, or azure://account/container/prefix
                let (container_name, prefix) = if parsed.username().is_empty() {
                    let path = parsed.path().trim_start_matches('/');
                    match path.split_once('/') {
                        Some((container, rest)) => (
                            container.to_string(),
                            (!rest.trim_matches('/').is_empty())
                                .then(|| rest.trim_matches('/').to_string()),
                        ),
                        None => (path.to_string(), None),
                    }
                } else {
                    (parsed.username().to_string(), path_prefix)
                };

                Ok(Self::Azure {
                    account_name,
                    container_name,
                    account_key: std::env::var("AZURE_STORAGE_KEY").ok(),
                    prefix,
                    endpoint: query("endpoint"),
                    client_id: None,
                    tenant_id: None,
                    client_secret: None,
                    sas_token: std::env::var("AZURE_STORAGE_SAS_TOKEN").ok(),
                    page_size,
                })
            }
            "gcs" | "gs" => {
                let bucket = parsed.host_str().unwrap_or_default().to_string();

                Ok(Self::Gcs {
                    bucket,
                    service_account_path: std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
                    prefix: path_prefix,
                    page_size,
                })
            }
            "file" => Ok(Self::Filesystem {
                path: PathBuf::from(parsed.path()),
                page_size,
            }),
            "memory" => Ok(Self::Memory { page_size }),
            scheme => Err(crate::Error::Config(format!(
                "Unknown storage scheme: {}",
                scheme
            ))),
        }
    }

    /// Get the prefix for this storage configuration
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::S3 { prefix, .. } => prefix.as_deref(),
            Self::Azure { prefix, .. } => prefix.as_deref(),
            Self::Gcs { prefix, .. } => prefix.as_deref(),
            Self::Filesystem { .. } => None,
            Self::Memory { .. } => None,
        }
    }

    /// Configured enumeration page size, if any
    pub fn page_size(&self) -> Option<usize> {
        match self {
            Self::S3 { page_size, .. }
            | Self::Azure { page_size, .. }
            | Self::Gcs { page_size, .. }
            | Self::Filesystem { page_size, .. }
            | Self::Memory { page_size } => *page_size,
        }
    }

    /// Reject configurations no backend could be built from.
    pub fn validate(&self) -> crate::Result<()> {
        if self.page_size() == Some(0) {
            return Err(crate::Error::Config(
                "page_size must be greater than zero".to_string(),
            ));
        }
        match self {
            Self::S3 { bucket, .. } | Self::Gcs { bucket, .. } if bucket.is_empty() => Err(
                crate::Error::Config("bucket must not be empty".to_string()),
            ),
            Self::Azure {
                account_name,
                container_name,
                ..
            } if account_name.is_empty() || container_name.is_empty() => Err(
                crate::Error::Config("Azure account and container are required".to_string()),
            ),
            Self::Filesystem { path, .. } if path.as_os_str().is_empty() => Err(
                crate::Error::Config("filesystem path must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
