//! Object-store discovery adapter
//!
//! Enumerates buckets/containers of a storage account and classifies their
//! objects. Container enumeration follows the partial-result policy: a
//! container that fails to list is recorded and skipped, never aborting the
//! batch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::source::{SourceGateway, SourceIdentity};
use super::trait_::DiscoveryAdapter;
use super::{
    AssetDescriptor, AssetKind, ContainerSummary, Discovery, DiscoveryError, leaf_name,
    object_asset_id, schema_of,
};
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

pub const SOURCE_LABEL: &str = "Object Store";

pub struct ObjectStoreAdapter {
    gateway: Arc<dyn SourceGateway>,
}

impl ObjectStoreAdapter {
    pub fn new(gateway: Arc<dyn SourceGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl DiscoveryAdapter for ObjectStoreAdapter {
    async fn discover(
        &self,
        config: &ConnectorDiscoveryConfig,
    ) -> Result<Discovery, DiscoveryError> {
        let identity = SourceIdentity::resolve(config)?;
        let client = self.gateway.object_store(&identity)?;

        let containers = match &config.container_name {
            Some(container) => vec![container.clone()],
            None => client
                .list_containers()
                .await
                .map_err(|err| DiscoveryError::remote_unavailable(err.to_string()))?,
        };
        debug!(
            account = %identity.account,
            containers = containers.len(),
            "Enumerating object-store containers"
        );

        let mut discovery = Discovery::default();
        for container in containers {
            let objects = match client.list_objects(&container).await {
                Ok(objects) => objects,
                Err(err) => {
                    warn!(
                        container = %container,
                        error = %err,
                        "Skipping container that failed to enumerate"
                    );
                    discovery.record_failure(&container, err);
                    continue;
                }
            };

            let mut asset_count = 0;
            for object in objects {
                discovery.assets.push(AssetDescriptor {
                    id: object_asset_id(&identity.account, &container, &object.key),
                    name: leaf_name(&object.key),
                    kind: AssetKind::classify(&object.key),
                    catalog: container.clone(),
                    schema_path: schema_of(&object.key),
                    size_bytes: object.size_bytes.unwrap_or(0),
                    last_modified: object.last_modified.unwrap_or_else(Utc::now),
                    source: SOURCE_LABEL.to_string(),
                });
                asset_count += 1;
            }

            discovery.containers.push(ContainerSummary {
                name: container,
                asset_count,
            });
        }

        Ok(discovery)
    }
}
