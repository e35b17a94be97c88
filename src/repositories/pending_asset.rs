//! Pending-asset repository for database operations

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use super::{NewPendingAsset, to_db_time};
use crate::models::pending_asset::{
    self, Column, Entity as PendingAsset, STATUS_PENDING, STATUS_PROCESSED,
};

#[derive(Debug, Clone)]
pub struct PendingAssetRepository {
    pub db: Arc<DatabaseConnection>,
}

impl PendingAssetRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Stage one change notification. If an unprocessed row for the same
    /// (asset id, connector) already exists, the event collapses onto it and
    /// its id is returned instead of inserting a duplicate.
    pub async fn stage(&self, record: &NewPendingAsset) -> Result<String, DbErr> {
        let existing = PendingAsset::find()
            .filter(Column::AssetId.eq(record.asset_id.clone()))
            .filter(Column::ConnectorId.eq(record.connector_id))
            .filter(Column::Status.eq(STATUS_PENDING))
            .one(self.db.as_ref())
            .await?;

        if let Some(existing) = existing {
            debug!(
                asset_id = %record.asset_id,
                pending_id = %existing.id,
                "Pending asset already staged for this change"
            );
            return Ok(existing.id);
        }

        let active = pending_asset::ActiveModel {
            id: Set(record.id.clone()),
            name: Set(record.name.clone()),
            asset_type: Set(record.asset_type.clone()),
            catalog: Set(record.catalog.clone()),
            connector_id: Set(record.connector_id),
            change_type: Set(record.change_type.clone()),
            source_event_type: Set(record.source_event_type.clone()),
            asset_id: Set(record.asset_id.clone()),
            asset_data: Set(record.asset_data.clone()),
            status: Set(STATUS_PENDING.to_string()),
            created_at: Set(to_db_time(record.received_at)),
            processed_at: Set(None),
        };
        active.insert(self.db.as_ref()).await?;
        Ok(record.id.clone())
    }

    pub async fn mark_processed(&self, pending_id: &str, at: DateTime<Utc>) -> Result<(), DbErr> {
        let active = pending_asset::ActiveModel {
            id: Set(pending_id.to_string()),
            status: Set(STATUS_PROCESSED.to_string()),
            processed_at: Set(Some(to_db_time(at))),
            ..Default::default()
        };
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// Unprocessed rows for a connector, oldest first (replay/audit view).
    pub async fn load_pending(
        &self,
        connector_id: Uuid,
    ) -> Result<Vec<pending_asset::Model>, DbErr> {
        PendingAsset::find()
            .filter(Column::ConnectorId.eq(connector_id))
            .filter(Column::Status.eq(STATUS_PENDING))
            .all(self.db.as_ref())
            .await
    }
}
