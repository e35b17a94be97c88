//! Connector repository for database operations
//!
//! The discovery engine treats connectors as externally managed rows: it
//! reads them every scheduler tick and writes back only the checkpoint
//! (`last_run`, `assets_count`) and health status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::to_db_time;
use crate::models::connector::{self, Column, Entity as Connector};

#[derive(Debug, Clone)]
pub struct ConnectorRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ConnectorRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All connectors, oldest first for stable scheduling order.
    pub async fn load_all(&self) -> Result<Vec<connector::Model>, DbErr> {
        Connector::find()
            .order_by_asc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<connector::Model>, DbErr> {
        Connector::find_by_id(id).one(self.db.as_ref()).await
    }

    /// Advance the scheduling checkpoint after a successful discovery pass.
    /// Also restores the connector to `active` health.
    pub async fn update_checkpoint(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        assets_count: u64,
    ) -> Result<(), DbErr> {
        let active = connector::ActiveModel {
            id: Set(id),
            last_run: Set(Some(to_db_time(at))),
            assets_count: Set(assets_count as i64),
            status: Set("active".to_string()),
            updated_at: Set(to_db_time(at)),
            ..Default::default()
        };
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// Record connector health without touching the checkpoint, so a failed
    /// pass is retried on the next tick.
    pub async fn set_status(&self, id: Uuid, status: &str) -> Result<(), DbErr> {
        let active = connector::ActiveModel {
            id: Set(id),
            status: Set(status.to_string()),
            updated_at: Set(to_db_time(Utc::now())),
            ..Default::default()
        };
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// First enabled connector of the given type, used when the webhook
    /// updater auto-selects its registration target.
    pub async fn first_enabled_of_type(
        &self,
        connector_type: &str,
    ) -> Result<Option<connector::Model>, DbErr> {
        Connector::find()
            .filter(Column::Enabled.eq(true))
            .filter(Column::ConnectorType.eq(connector_type))
            .order_by_asc(Column::CreatedAt)
            .one(self.db.as_ref())
            .await
    }
}
