//! Database migrations for the catalogd service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000100_create_connectors;
mod m2025_06_01_000200_create_assets;
mod m2025_06_01_000300_create_pending_assets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000100_create_connectors::Migration),
            Box::new(m2025_06_01_000200_create_assets::Migration),
            Box::new(m2025_06_01_000300_create_pending_assets::Migration),
        ]
    }
}
