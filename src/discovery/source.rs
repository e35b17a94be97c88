//! Source identity resolution and remote client capability traits.
//!
//! Vendor SDK construction is deliberately outside this crate: adapters talk
//! to narrow client traits obtained from a [`SourceGateway`], so any backing
//! implementation (cloud SDK, REST shim, test fake) can be plugged in.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::DiscoveryError;
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

/// Resolved identity of a storage account, derived from connector config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    /// Account/namespace name, used in asset ids.
    pub account: String,
    /// Shared key when one was supplied; gateways may not need it.
    pub account_key: Option<String>,
}

impl SourceIdentity {
    /// Resolve an identity from an explicit credential pair or an opaque
    /// connection descriptor of `Key=Value;` pairs.
    pub fn resolve(config: &ConnectorDiscoveryConfig) -> Result<Self, DiscoveryError> {
        if let Some(account) = &config.account_name {
            return Ok(Self {
                account: account.clone(),
                account_key: config.account_key.clone(),
            });
        }

        if let Some(raw) = &config.connection_string {
            if let Some(identity) = Self::from_connection_string(raw) {
                return Ok(identity);
            }
            return Err(DiscoveryError::configuration(
                "connection string does not carry an account name",
            ));
        }

        Err(DiscoveryError::configuration(
            "either account_name/account_key or connection_string must be provided",
        ))
    }

    fn from_connection_string(raw: &str) -> Option<Self> {
        let mut account = None;
        let mut account_key = None;
        for part in raw.split(';') {
            if let Some((key, value)) = part.split_once('=') {
                match key.trim() {
                    "AccountName" => account = Some(value.trim().to_string()),
                    "AccountKey" => account_key = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }
        account.map(|account| Self {
            account,
            account_key,
        })
    }
}

/// Error from a single remote listing call.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote call failed: {0}")]
    Unavailable(String),
    #[error("access denied: {0}")]
    Denied(String),
}

/// One object in a flat (object-store) listing.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    pub key: String,
    pub size_bytes: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One entry in a hierarchical (file-share) directory listing.
#[derive(Debug, Clone)]
pub enum RemoteEntry {
    Directory {
        name: String,
    },
    File {
        name: String,
        size_bytes: Option<i64>,
        last_modified: Option<DateTime<Utc>>,
    },
}

#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<String>, RemoteError>;
    async fn list_objects(&self, container: &str) -> Result<Vec<RemoteObject>, RemoteError>;
}

#[async_trait]
pub trait FileShareClient: Send + Sync {
    async fn list_shares(&self) -> Result<Vec<String>, RemoteError>;
    /// List one directory level; `path` is empty for the share root.
    async fn list_directory(&self, share: &str, path: &str)
    -> Result<Vec<RemoteEntry>, RemoteError>;
}

#[async_trait]
pub trait TableServiceClient: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, RemoteError>;
}

#[async_trait]
pub trait QueueServiceClient: Send + Sync {
    async fn list_queues(&self) -> Result<Vec<String>, RemoteError>;
}

/// Opaque capability provider turning a resolved identity into service
/// clients. Implementations own credential handling and transport.
pub trait SourceGateway: Send + Sync {
    fn object_store(
        &self,
        identity: &SourceIdentity,
    ) -> Result<Arc<dyn ObjectStoreClient>, DiscoveryError>;

    fn file_share(
        &self,
        identity: &SourceIdentity,
    ) -> Result<Arc<dyn FileShareClient>, DiscoveryError>;

    fn table_service(
        &self,
        identity: &SourceIdentity,
    ) -> Result<Arc<dyn TableServiceClient>, DiscoveryError>;

    fn queue_service(
        &self,
        identity: &SourceIdentity,
    ) -> Result<Arc<dyn QueueServiceClient>, DiscoveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(value: serde_json::Value) -> ConnectorDiscoveryConfig {
        ConnectorDiscoveryConfig::from_config(Some(&value))
    }

    #[test]
    fn resolves_explicit_credential_pair() {
        let config = config_with(serde_json::json!({
            "account_name": "acct",
            "account_key": "s3cr3t",
        }));
        let identity = SourceIdentity::resolve(&config).unwrap();
        assert_eq!(identity.account, "acct");
        assert_eq!(identity.account_key.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn resolves_connection_string() {
        let config = config_with(serde_json::json!({
            "connection_string":
                "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=abc==;EndpointSuffix=example.net",
        }));
        let identity = SourceIdentity::resolve(&config).unwrap();
        assert_eq!(identity.account, "acct");
        assert_eq!(identity.account_key.as_deref(), Some("abc=="));
    }

    #[test]
    fn missing_credentials_is_a_configuration_error() {
        let config = config_with(serde_json::json!({}));
        let err = SourceIdentity::resolve(&config).unwrap_err();
        assert!(matches!(err, DiscoveryError::Configuration { .. }));
    }

    #[test]
    fn connection_string_without_account_is_rejected() {
        let config = config_with(serde_json::json!({
            "connection_string": "DefaultEndpointsProtocol=https;EndpointSuffix=example.net",
        }));
        let err = SourceIdentity::resolve(&config).unwrap_err();
        assert!(matches!(err, DiscoveryError::Configuration { .. }));
    }
}
