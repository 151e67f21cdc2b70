//! Configuration for copy jobs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::EnumerationFilter;
use crate::storage::StorageBackendConfig;

/// A copy job: where to read, where to write, and what to take.
///
/// ```yaml
/// source:
///   backend: filesystem
///   path: /data/in
/// destination:
///   backend: s3
///   bucket: my-bucket
/// stop_after: -1
/// filter:
///   prefix: logs/
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyJobConfig {
    /// Backend blobs are read from
    pub source: StorageBackendConfig,

    /// Backend blobs are written to
    pub destination: StorageBackendConfig,

    /// Number of blobs to write before stopping, `-1` for all
    #[serde(default = "default_stop_after")]
    pub stop_after: i64,

    /// Enumeration filter applied to the source
    #[serde(default)]
    pub filter: Option<EnumerationFilter>,

    /// Continuation token to resume the source enumeration from
    #[serde(default)]
    pub continuation_token: Option<String>,
}

fn default_stop_after() -> i64 {
    -1
}

impl CopyJobConfig {
    /// Load and validate a job from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a job from YAML text
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| crate::Error::Config(format!("Invalid copy job: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.stop_after == 0 || self.stop_after < -1 {
            return Err(crate::Error::Config(format!(
                "stop_after must be -1 or > 0, got {}",
                self.stop_after
            )));
        }

        if let Some(filter) = &self.filter {
            if filter.minimum_size > filter.maximum_size {
                return Err(crate::Error::Config(format!(
                    "filter minimum_size ({}) > maximum_size ({})",
                    filter.minimum_size, filter.maximum_size
                )));
            }
            filter
                .validate()
                .map_err(|e| crate::Error::Config(format!("Invalid filter: {}", e)))?;
        }

        self.source.validate()?;
        self.destination.validate()?;

        Ok(())
    }
}
