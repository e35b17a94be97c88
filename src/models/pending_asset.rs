//! Pending asset entity model
//!
//! Staging record for one inbound change notification. Written in `pending`
//! status before reconciliation runs so a crash mid-processing leaves a
//! durable trail; marked `processed` afterwards and retained for audit.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Pending-asset status before reconciliation has consumed the event.
pub const STATUS_PENDING: &str = "pending";
/// Pending-asset status once reconciliation succeeded.
pub const STATUS_PROCESSED: &str = "processed";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_assets")]
pub struct Model {
    /// Synthetic identifier derived from the event (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Leaf name of the changed object
    pub name: String,

    /// Classified kind of the changed object
    pub asset_type: String,

    /// Container the change happened in
    pub catalog: String,

    /// Connector owning the container
    pub connector_id: Uuid,

    /// created | updated | removed
    pub change_type: String,

    /// Raw source event type string (e.g. `OBJECT_FINALIZE`)
    pub source_event_type: String,

    /// Catalog asset id the change resolves to
    pub asset_id: String,

    /// Normalized descriptor payload for created/updated changes
    #[sea_orm(column_type = "JsonBinary")]
    pub asset_data: Option<JsonValue>,

    /// pending | processed
    pub status: String,

    /// Timestamp when the event was received
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when reconciliation consumed the event
    pub processed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::connector::Entity",
        from = "Column::ConnectorId",
        to = "super::connector::Column::Id"
    )]
    Connector,
}

impl Related<super::connector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connector.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
