//! Shared helpers for integration tests: an in-memory catalog database plus
//! connector fixtures.

#![allow(dead_code)]

use catalogd::migration::{Migrator, MigratorTrait};
use catalogd::models::connector;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Fresh sqlite::memory: database with all migrations applied.
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("create in-memory db");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

pub async fn insert_connector(
    db: &DatabaseConnection,
    name: &str,
    connector_type: &str,
    enabled: bool,
    config: JsonValue,
) -> connector::Model {
    insert_connector_with_last_run(db, name, connector_type, enabled, config, None).await
}

pub async fn insert_connector_with_last_run(
    db: &DatabaseConnection,
    name: &str,
    connector_type: &str,
    enabled: bool,
    config: JsonValue,
    last_run: Option<DateTime<Utc>>,
) -> connector::Model {
    let now = Utc::now();
    let active = connector::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        connector_type: Set(connector_type.to_string()),
        enabled: Set(enabled),
        status: Set("active".to_string()),
        config: Set(Some(config)),
        last_run: Set(last_run.map(Into::into)),
        assets_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    active.insert(db).await.expect("insert connector")
}
