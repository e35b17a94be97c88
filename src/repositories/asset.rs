//! Asset repository for database operations
//!
//! All catalog writes are single-row upserts keyed by the asset id, which is
//! what makes event-driven and poll-driven reconciliation safe to race.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use serde_json::json;
use uuid::Uuid;

use super::{NewAsset, is_unique_violation, to_db_time};
use crate::models::asset::{self, Column, Entity as Asset, STATUS_ACTIVE, STATUS_REMOVED};

#[derive(Debug, Clone)]
pub struct AssetRepository {
    pub db: Arc<DatabaseConnection>,
}

impl AssetRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Load assets, optionally scoped to one connector. Reconciliation always
    /// passes a connector id so one connector's pass never sees another's
    /// slice.
    pub async fn load(&self, connector_id: Option<Uuid>) -> Result<Vec<asset::Model>, DbErr> {
        let mut query = Asset::find();
        if let Some(connector_id) = connector_id {
            query = query.filter(Column::ConnectorId.eq(connector_id));
        }
        query.all(self.db.as_ref()).await
    }

    /// Insert or update one asset row. Returns `true` when a new row was
    /// inserted. Updates keep the original `discovered_at` and flip the row
    /// back to `active` if it had been soft-deleted.
    pub async fn upsert(&self, record: &NewAsset) -> Result<bool, DbErr> {
        let existing = Asset::find_by_id(record.descriptor.id.clone())
            .one(self.db.as_ref())
            .await?;

        match existing {
            Some(_) => {
                self.apply_update(record).await?;
                Ok(false)
            }
            None => match self.apply_insert(record).await {
                Ok(()) => Ok(true),
                // Lost an insert race with a concurrent writer; converge on
                // the update path.
                Err(err) if is_unique_violation(&err) => {
                    self.apply_update(record).await?;
                    Ok(false)
                }
                Err(err) => Err(err),
            },
        }
    }

    async fn apply_insert(&self, record: &NewAsset) -> Result<(), DbErr> {
        let descriptor = &record.descriptor;
        let active = asset::ActiveModel {
            id: Set(descriptor.id.clone()),
            name: Set(descriptor.name.clone()),
            asset_type: Set(descriptor.kind.as_str().to_string()),
            catalog: Set(descriptor.catalog.clone()),
            schema_path: Set(descriptor.schema_path.clone()),
            size_bytes: Set(descriptor.size_bytes),
            last_modified: Set(to_db_time(descriptor.last_modified)),
            connector_id: Set(record.connector_id),
            status: Set(STATUS_ACTIVE.to_string()),
            discovered_at: Set(to_db_time(record.observed_at)),
            metadata: Set(Some(json!({ "data_source": descriptor.source }))),
            updated_at: Set(to_db_time(record.observed_at)),
        };
        active.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn apply_update(&self, record: &NewAsset) -> Result<(), DbErr> {
        let descriptor = &record.descriptor;
        let active = asset::ActiveModel {
            id: Set(descriptor.id.clone()),
            name: Set(descriptor.name.clone()),
            asset_type: Set(descriptor.kind.as_str().to_string()),
            catalog: Set(descriptor.catalog.clone()),
            schema_path: Set(descriptor.schema_path.clone()),
            size_bytes: Set(descriptor.size_bytes),
            last_modified: Set(to_db_time(descriptor.last_modified)),
            connector_id: Set(record.connector_id),
            status: Set(STATUS_ACTIVE.to_string()),
            updated_at: Set(to_db_time(record.observed_at)),
            ..Default::default()
        };
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// Soft delete. Returns `false` when the id is not in the catalog (e.g. a
    /// removal event for an object that was never discovered).
    pub async fn mark_removed(&self, asset_id: &str, at: DateTime<Utc>) -> Result<bool, DbErr> {
        let active = asset::ActiveModel {
            id: Set(asset_id.to_string()),
            status: Set(STATUS_REMOVED.to_string()),
            updated_at: Set(to_db_time(at)),
            ..Default::default()
        };
        match active.update(self.db.as_ref()).await {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Non-removed asset count for a connector, persisted as its
    /// `assets_count` checkpoint field.
    pub async fn count_active(&self, connector_id: Uuid) -> Result<u64, DbErr> {
        Asset::find()
            .filter(Column::ConnectorId.eq(connector_id))
            .filter(Column::Status.ne(STATUS_REMOVED))
            .count(self.db.as_ref())
            .await
    }
}
