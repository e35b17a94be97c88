//! Catalog store gateway
//!
//! The narrow read/write interface between the discovery engine and the
//! persisted catalog. Engine components hold `Arc<dyn CatalogStore>` so
//! tests can substitute the backing store; production uses
//! [`DbCatalogStore`], which composes the SeaORM repositories.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{asset, connector};
use crate::repositories::{
    AssetRepository, ConnectorRepository, NewAsset, NewPendingAsset, PendingAssetRepository,
};

/// Error from a catalog store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Db {
        context: &'static str,
        #[source]
        source: DbErr,
    },
}

impl StoreError {
    pub fn db(context: &'static str, source: DbErr) -> Self {
        Self::Db { context, source }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load_connectors(&self) -> Result<Vec<connector::Model>, StoreError>;

    async fn load_connector(&self, id: Uuid) -> Result<Option<connector::Model>, StoreError>;

    /// First enabled connector of the given type (webhook updater target
    /// auto-selection).
    async fn first_enabled_connector(
        &self,
        connector_type: &str,
    ) -> Result<Option<connector::Model>, StoreError>;

    async fn load_assets(
        &self,
        connector_id: Option<Uuid>,
    ) -> Result<Vec<asset::Model>, StoreError>;

    /// Insert or update one asset. Returns `true` when a new row was
    /// inserted.
    async fn upsert_asset(&self, record: &NewAsset) -> Result<bool, StoreError>;

    /// Soft delete one asset. Returns `false` when the id is unknown.
    async fn mark_asset_removed(
        &self,
        asset_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn count_assets(&self, connector_id: Uuid) -> Result<u64, StoreError>;

    /// Advance the scheduling checkpoint after a successful full pass.
    async fn update_connector_checkpoint(
        &self,
        connector_id: Uuid,
        at: DateTime<Utc>,
        assets_count: u64,
    ) -> Result<(), StoreError>;

    async fn set_connector_status(
        &self,
        connector_id: Uuid,
        status: &str,
    ) -> Result<(), StoreError>;

    /// Stage one inbound change notification; returns the id of the pending
    /// row now representing it (existing row when the event collapses onto a
    /// duplicate).
    async fn stage_pending_asset(&self, record: &NewPendingAsset) -> Result<String, StoreError>;

    async fn mark_pending_processed(
        &self,
        pending_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// SeaORM-backed catalog store.
#[derive(Debug, Clone)]
pub struct DbCatalogStore {
    connectors: ConnectorRepository,
    assets: AssetRepository,
    pending: PendingAssetRepository,
}

impl DbCatalogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            connectors: ConnectorRepository::new(db.clone()),
            assets: AssetRepository::new(db.clone()),
            pending: PendingAssetRepository::new(db),
        }
    }
}

#[async_trait]
impl CatalogStore for DbCatalogStore {
    async fn load_connectors(&self) -> Result<Vec<connector::Model>, StoreError> {
        self.connectors
            .load_all()
            .await
            .map_err(|err| StoreError::db("failed to load connectors", err))
    }

    async fn load_connector(&self, id: Uuid) -> Result<Option<connector::Model>, StoreError> {
        self.connectors
            .find_by_id(id)
            .await
            .map_err(|err| StoreError::db("failed to load connector", err))
    }

    async fn first_enabled_connector(
        &self,
        connector_type: &str,
    ) -> Result<Option<connector::Model>, StoreError> {
        self.connectors
            .first_enabled_of_type(connector_type)
            .await
            .map_err(|err| StoreError::db("failed to load enabled connector", err))
    }

    async fn load_assets(
        &self,
        connector_id: Option<Uuid>,
    ) -> Result<Vec<asset::Model>, StoreError> {
        self.assets
            .load(connector_id)
            .await
            .map_err(|err| StoreError::db("failed to load assets", err))
    }

    async fn upsert_asset(&self, record: &NewAsset) -> Result<bool, StoreError> {
        self.assets
            .upsert(record)
            .await
            .map_err(|err| StoreError::db("failed to upsert asset", err))
    }

    async fn mark_asset_removed(
        &self,
        asset_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.assets
            .mark_removed(asset_id, at)
            .await
            .map_err(|err| StoreError::db("failed to mark asset removed", err))
    }

    async fn count_assets(&self, connector_id: Uuid) -> Result<u64, StoreError> {
        self.assets
            .count_active(connector_id)
            .await
            .map_err(|err| StoreError::db("failed to count assets", err))
    }

    async fn update_connector_checkpoint(
        &self,
        connector_id: Uuid,
        at: DateTime<Utc>,
        assets_count: u64,
    ) -> Result<(), StoreError> {
        self.connectors
            .update_checkpoint(connector_id, at, assets_count)
            .await
            .map_err(|err| StoreError::db("failed to update connector checkpoint", err))
    }

    async fn set_connector_status(
        &self,
        connector_id: Uuid,
        status: &str,
    ) -> Result<(), StoreError> {
        self.connectors
            .set_status(connector_id, status)
            .await
            .map_err(|err| StoreError::db("failed to update connector status", err))
    }

    async fn stage_pending_asset(&self, record: &NewPendingAsset) -> Result<String, StoreError> {
        self.pending
            .stage(record)
            .await
            .map_err(|err| StoreError::db("failed to stage pending asset", err))
    }

    async fn mark_pending_processed(
        &self,
        pending_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.pending
            .mark_processed(pending_id, at)
            .await
            .map_err(|err| StoreError::db("failed to mark pending asset processed", err))
    }
}
