//! Azure Blob Storage backend implementation.

use object_store::azure::MicrosoftAzureBuilder;
use std::sync::Arc;
use tracing::{debug, info};

use super::object::{delegate_object_store, ObjectStoreBackend};
use crate::{Error, Result};

/// Azure Blob Storage backend configuration
#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    /// Azure storage account name
    pub account_name: String,
    /// Azure blob container name
    pub container_name: String,
    /// Storage account key (if None, uses the default credential chain)
    pub account_key: Option<String>,
    /// Key prefix for all operations
    pub prefix: Option<String>,
    /// Custom endpoint URL (sovereign clouds, Azurite)
    pub endpoint: Option<String>,
    /// Azure AD client ID (service principal)
    pub client_id: Option<String>,
    /// Azure AD tenant ID (service principal)
    pub tenant_id: Option<String>,
    /// Client secret (service principal)
    pub client_secret: Option<String>,
    /// SAS token for shared access signature authentication
    pub sas_token: Option<String>,
}

impl AzureConfig {
    /// Base URL blobs in this container are addressed under
    pub fn url_base(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                self.container_name
            ),
            None => format!(
                "https://{}.blob.core.windows.net/{}",
                self.account_name, self.container_name
            ),
        }
    }
}

/// Parse a SAS query string into key/value pairs
fn parse_sas_token(sas_token: &str) -> Vec<(String, String)> {
    sas_token
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// Azure Blob Storage backend
pub struct AzureBackend {
    inner: ObjectStoreBackend,
}

impl AzureBackend {
    /// Create a new Azure Blob Storage backend
    ///
    /// Authentication methods (in order of precedence):
    /// 1. SAS token (`sas_token`)
    /// 2. Storage account key (`account_key`)
    /// 3. Service principal (`client_id` + `client_secret` + `tenant_id`)
    /// 4. Default credential chain (environment, managed identity, CLI)
    pub fn new(config: AzureConfig) -> Result<Self> {
        if config.account_name.is_empty() || config.container_name.is_empty() {
            return Err(Error::Config(
                "Azure account and container are required".to_string(),
            ));
        }

        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&config.account_name)
            .with_container_name(&config.container_name);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }

        if let Some(sas_token) = &config.sas_token {
            builder = builder.with_sas_authorization(parse_sas_token(sas_token));
            debug!("Azure authentication: SAS token");
        } else if let Some(key) = &config.account_key {
            builder = builder.with_access_key(key);
            debug!("Azure authentication: Account key");
        } else if let Some(client_secret) = &config.client_secret {
            if let Some(client_id) = &config.client_id {
                builder = builder.with_client_id(client_id);
            }
            if let Some(tenant_id) = &config.tenant_id {
                builder = builder.with_tenant_id(tenant_id);
            }
            builder = builder.with_client_secret(client_secret);
            debug!("Azure authentication: Service principal");
        } else {
            debug!("Azure authentication: default credential chain");
        }

        let store = builder
            .build()
            .map_err(|e| Error::backend(format!("Failed to create Azure client: {}", e)))?;

        info!(
            "Created Azure backend for account: {}, container: {}, prefix: {:?}",
            config.account_name, config.container_name, config.prefix
        );

        let url_base = config.url_base();
        Ok(Self {
            inner: ObjectStoreBackend::new(
                "azure",
                "Azure",
                Arc::new(store),
                config.prefix,
                url_base,
            ),
        })
    }
}

delegate_object_store!(AzureBackend);
