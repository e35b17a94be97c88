//! Migration to create the assets table.
//!
//! The asset id is a source-derived URI and serves as the idempotency key for
//! repeated discovery; rows are soft-deleted (`status = removed`), never
//! erased by the discovery engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assets::Id)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assets::Name).text().not_null())
                    .col(ColumnDef::new(Assets::AssetType).text().not_null())
                    .col(ColumnDef::new(Assets::Catalog).text().not_null())
                    .col(ColumnDef::new(Assets::SchemaPath).text().not_null())
                    .col(
                        ColumnDef::new(Assets::SizeBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Assets::LastModified)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Assets::ConnectorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Assets::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Assets::DiscoveredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Assets::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Assets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assets_connector_id")
                            .from(Assets::Table, Assets::ConnectorId)
                            .to(Connectors::Table, Connectors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Reconciliation always works on one connector's slice of the catalog
        manager
            .create_index(
                Index::create()
                    .name("idx_assets_connector_id")
                    .table(Assets::Table)
                    .col(Assets::ConnectorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assets_connector_status")
                    .table(Assets::Table)
                    .col(Assets::ConnectorId)
                    .col(Assets::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_assets_connector_status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_assets_connector_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Assets {
    Table,
    Id,
    Name,
    AssetType,
    Catalog,
    SchemaPath,
    SizeBytes,
    LastModified,
    ConnectorId,
    Status,
    DiscoveredAt,
    Metadata,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Connectors {
    Table,
    Id,
}
