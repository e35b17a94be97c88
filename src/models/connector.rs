//! Connector entity model
//!
//! A connector binds one remote storage source to the catalog: source kind,
//! opaque credential/scope config, and the discovery checkpoint consumed by
//! the scheduler. Connectors are created by an external management surface;
//! the discovery engine only updates their checkpoint and status.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Connector type slug for object stores (buckets of objects).
pub const TYPE_OBJECT_STORE: &str = "object-store";
/// Connector type slug for hierarchical file shares.
pub const TYPE_FILE_SHARE: &str = "file-share";
/// Connector type slug for table services.
pub const TYPE_TABLE_SERVICE: &str = "table-service";
/// Connector type slug for queue services.
pub const TYPE_QUEUE_SERVICE: &str = "queue-service";
/// Connector type slug for plain file-system roots.
pub const TYPE_FILE_SYSTEM: &str = "file-system";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connectors")]
pub struct Model {
    /// Unique identifier for the connector (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable connector name
    pub name: String,

    /// Source kind slug, selects the discovery adapter
    pub connector_type: String,

    /// Disabled connectors are skipped by the scheduler entirely
    pub enabled: bool,

    /// Connector health as of the last discovery attempt (active|error)
    pub status: String,

    /// Opaque configuration: credentials, scope filters,
    /// `rediscovery_interval_minutes`, configured container list
    #[sea_orm(column_type = "JsonBinary")]
    pub config: Option<JsonValue>,

    /// Timestamp of the last successful discovery pass; absent means never run
    pub last_run: Option<DateTimeWithTimeZone>,

    /// Number of non-removed assets after the last successful pass
    pub assets_count: i64,

    /// Timestamp when the connector was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the connector was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::asset::Entity")]
    Asset,
    #[sea_orm(has_many = "super::pending_asset::Entity")]
    PendingAsset,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl Related<super::pending_asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PendingAsset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
