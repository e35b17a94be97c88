//! Migration to create the connectors table.
//!
//! A connector binds one remote storage source to the catalog: its type,
//! credentials/scope (opaque config JSON), and the discovery checkpoint the
//! scheduler consumes (`last_run`, `assets_count`).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connectors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connectors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connectors::Name).text().not_null())
                    .col(ColumnDef::new(Connectors::ConnectorType).text().not_null())
                    .col(
                        ColumnDef::new(Connectors::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Connectors::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Connectors::Config).json_binary().null())
                    .col(
                        ColumnDef::new(Connectors::LastRun)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Connectors::AssetsCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Connectors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connectors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for the scheduler's enabled-connector scan
        manager
            .create_index(
                Index::create()
                    .name("idx_connectors_enabled")
                    .table(Connectors::Table)
                    .col(Connectors::Enabled)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_connectors_enabled").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Connectors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Connectors {
    Table,
    Id,
    Name,
    ConnectorType,
    Enabled,
    Status,
    Config,
    LastRun,
    AssetsCount,
    CreatedAt,
    UpdatedAt,
}
