//! Queue-service discovery adapter

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::source::{SourceGateway, SourceIdentity};
use super::trait_::DiscoveryAdapter;
use super::{
    AssetDescriptor, AssetKind, ContainerSummary, Discovery, DiscoveryError, queue_asset_id,
};
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

pub const SOURCE_LABEL: &str = "Queue Service";

pub struct QueueServiceAdapter {
    gateway: Arc<dyn SourceGateway>,
}

impl QueueServiceAdapter {
    pub fn new(gateway: Arc<dyn SourceGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl DiscoveryAdapter for QueueServiceAdapter {
    async fn discover(
        &self,
        config: &ConnectorDiscoveryConfig,
    ) -> Result<Discovery, DiscoveryError> {
        let identity = SourceIdentity::resolve(config)?;
        let client = self.gateway.queue_service(&identity)?;

        let queues = client
            .list_queues()
            .await
            .map_err(|err| DiscoveryError::remote_unavailable(err.to_string()))?;

        let mut discovery = Discovery::default();
        let asset_count = queues.len();
        for queue in queues {
            discovery.assets.push(AssetDescriptor {
                id: queue_asset_id(&identity.account, &queue),
                name: queue,
                kind: AssetKind::Queue,
                catalog: identity.account.clone(),
                schema_path: "queues".to_string(),
                size_bytes: 0,
                last_modified: Utc::now(),
                source: SOURCE_LABEL.to_string(),
            });
        }
        discovery.containers.push(ContainerSummary {
            name: identity.account,
            asset_count,
        });

        Ok(discovery)
    }
}
