//! # Repositories
//!
//! SeaORM data access for the catalog tables. Each repository owns an
//! `Arc<DatabaseConnection>`; the [`crate::store::CatalogStore`] gateway
//! composes them into the narrow interface the engine components consume.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{DbErr, RuntimeErr};
use serde_json::Value as JsonValue;
use uuid::Uuid;

pub mod asset;
pub mod connector;
pub mod connector_config;
pub mod pending_asset;

pub use asset::AssetRepository;
pub use connector::ConnectorRepository;
pub use connector_config::ConnectorDiscoveryConfig;
pub use pending_asset::PendingAssetRepository;

use crate::discovery::AssetDescriptor;

/// Input for an asset upsert: the discovered descriptor plus ownership and
/// observation time. `observed_at` becomes `discovered_at` only on insert.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub descriptor: AssetDescriptor,
    pub connector_id: Uuid,
    pub observed_at: DateTime<Utc>,
}

/// Input for staging one inbound change notification.
#[derive(Debug, Clone)]
pub struct NewPendingAsset {
    pub id: String,
    pub name: String,
    pub asset_type: String,
    pub catalog: String,
    pub connector_id: Uuid,
    pub change_type: String,
    pub source_event_type: String,
    pub asset_id: String,
    pub asset_data: Option<JsonValue>,
    pub received_at: DateTime<Utc>,
}

pub(crate) fn to_db_time(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    DateTime::from_naive_utc_and_offset(
        dt.naive_utc(),
        FixedOffset::east_opt(0).expect("UTC offset"),
    )
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sea_orm::SqlxError::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sea_orm::SqlxError::Database(db_err))) => {
            db_err.is_unique_violation()
                || matches!(
                    db_err.code().as_deref(),
                    Some("23505") | Some("1555") | Some("2067")
                )
        }
        _ => false,
    }
}
