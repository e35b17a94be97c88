//! Table-service discovery adapter
//!
//! Tables are flat account-level assets: the account is the catalog and the
//! logical namespace is fixed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::source::{SourceGateway, SourceIdentity};
use super::trait_::DiscoveryAdapter;
use super::{
    AssetDescriptor, AssetKind, ContainerSummary, Discovery, DiscoveryError, table_asset_id,
};
use crate::repositories::connector_config::ConnectorDiscoveryConfig;

pub const SOURCE_LABEL: &str = "Table Service";

pub struct TableServiceAdapter {
    gateway: Arc<dyn SourceGateway>,
}

impl TableServiceAdapter {
    pub fn new(gateway: Arc<dyn SourceGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl DiscoveryAdapter for TableServiceAdapter {
    async fn discover(
        &self,
        config: &ConnectorDiscoveryConfig,
    ) -> Result<Discovery, DiscoveryError> {
        let identity = SourceIdentity::resolve(config)?;
        let client = self.gateway.table_service(&identity)?;

        let tables = client
            .list_tables()
            .await
            .map_err(|err| DiscoveryError::remote_unavailable(err.to_string()))?;

        let mut discovery = Discovery::default();
        let asset_count = tables.len();
        for table in tables {
            discovery.assets.push(AssetDescriptor {
                id: table_asset_id(&identity.account, &table),
                name: table,
                kind: AssetKind::Table,
                catalog: identity.account.clone(),
                schema_path: "tables".to_string(),
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
