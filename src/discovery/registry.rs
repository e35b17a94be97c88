//! Adapter registry
//!
//! Maps connector type slugs onto discovery adapters. The set of source
//! kinds is closed; dispatch happens once per connector here instead of
//! string branching in callers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::file_share::FileShareAdapter;
use super::filesystem::FileSystemAdapter;
use super::object_store::ObjectStoreAdapter;
use super::queue_service::QueueServiceAdapter;
use super::source::SourceGateway;
use super::table_service::TableServiceAdapter;
use super::trait_::DiscoveryAdapter;
use crate::models::connector::{
    TYPE_FILE_SHARE, TYPE_FILE_SYSTEM, TYPE_OBJECT_STORE, TYPE_QUEUE_SERVICE, TYPE_TABLE_SERVICE,
};

/// Error type for registry operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("no discovery adapter registered for connector type '{kind}'")]
    AdapterNotFound { kind: String },
}

/// Registry of discovery adapters keyed by connector type slug.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn DiscoveryAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard registry. The file-system adapter is
    /// self-contained and always present; the remote adapters need a source
    /// gateway and are skipped with a warning when none is supplied.
    pub fn initialize(gateway: Option<Arc<dyn SourceGateway>>) -> Self {
        let mut registry = Self::new();
        registry.register(TYPE_FILE_SYSTEM, Arc::new(FileSystemAdapter::new()));

        match gateway {
            Some(gateway) => {
                registry.register(
                    TYPE_OBJECT_STORE,
                    Arc::new(ObjectStoreAdapter::new(gateway.clone())),
                );
                registry.register(
                    TYPE_FILE_SHARE,
                    Arc::new(FileShareAdapter::new(gateway.clone())),
                );
                registry.register(
                    TYPE_TABLE_SERVICE,
                    Arc::new(TableServiceAdapter::new(gateway.clone())),
                );
                registry.register(TYPE_QUEUE_SERVICE, Arc::new(QueueServiceAdapter::new(gateway)));
            }
            None => {
                warn!(
                    "No source gateway configured; only file-system connectors can be discovered"
                );
            }
        }

        registry
    }

    pub fn register(&mut self, kind: &str, adapter: Arc<dyn DiscoveryAdapter>) {
        self.adapters.insert(kind.to_string(), adapter);
    }

    pub fn get(&self, kind: &str) -> Result<Arc<dyn DiscoveryAdapter>, RegistryError> {
        self.adapters
            .get(kind)
            .cloned()
            .ok_or_else(|| RegistryError::AdapterNotFound {
                kind: kind.to_string(),
            })
    }

    /// Registered type slugs, sorted for stable ordering.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.adapters.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::repositories::connector_config::ConnectorDiscoveryConfig;
    use async_trait::async_trait;

    struct NullAdapter;

    #[async_trait]
    impl DiscoveryAdapter for NullAdapter {
        async fn discover(
            &self,
            _config: &ConnectorDiscoveryConfig,
        ) -> Result<Discovery, crate::discovery::DiscoveryError> {
            Ok(Discovery::default())
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = AdapterRegistry::new();
        let err = match registry.get("object-store") {
            Ok(_) => panic!("expected AdapterNotFound error"),
            Err(e) => e,
        };
        let RegistryError::AdapterNotFound { kind } = err;
        assert_eq!(kind, "object-store");
    }

    #[test]
    fn registered_kind_resolves() {
        let mut registry = AdapterRegistry::new();
        registry.register("object-store", Arc::new(NullAdapter));
        assert!(registry.get("object-store").is_ok());
    }

    #[test]
    fn initialize_without_gateway_registers_only_filesystem() {
        let registry = AdapterRegistry::initialize(None);
        assert_eq!(registry.kinds(), vec![TYPE_FILE_SYSTEM.to_string()]);
    }
}
