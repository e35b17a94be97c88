//! Asset entity model
//!
//! One discovered catalog entry. The id is a source-derived URI and is the
//! idempotency key: re-discovery of the same remote object resolves to the
//! same row. Rows are soft-deleted (`status = removed`), never erased here.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Asset status: visible in the catalog.
pub const STATUS_ACTIVE: &str = "active";
/// Asset status: soft-deleted after vanishing from a full listing.
pub const STATUS_REMOVED: &str = "removed";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    /// Source-derived URI, stable across repeated discovery (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Leaf name of the object (file name, table name, ...)
    pub name: String,

    /// Classified kind: Folder/File/Data File/Script/Text File/Archive/Table/Queue
    pub asset_type: String,

    /// Top-level container (bucket, share, account)
    pub catalog: String,

    /// Path prefix or logical namespace within the catalog
    pub schema_path: String,

    /// Object size; 0 when the source omits it
    pub size_bytes: i64,

    /// Source modification time; discovery time when the source omits it
    pub last_modified: DateTimeWithTimeZone,

    /// Owning connector
    pub connector_id: Uuid,

    /// active | pending | removed
    pub status: String,

    /// First-discovery timestamp; never changed by subsequent updates
    pub discovered_at: DateTimeWithTimeZone,

    /// Source-specific extras (data source label, raw event payload, ...)
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Option<JsonValue>,

    /// Timestamp when the row was last written
    pub updated_at: DateTimeWithTimeZone,
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
