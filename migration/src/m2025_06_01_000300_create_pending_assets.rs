//! Migration to create the pending_assets table.
//!
//! Pending assets stage one inbound change notification each so event receipt
//! is decoupled from reconciliation. Rows are marked processed, not deleted.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PendingAssets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PendingAssets::Id)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PendingAssets::Name).text().not_null())
                    .col(ColumnDef::new(PendingAssets::AssetType).text().not_null())
                    .col(ColumnDef::new(PendingAssets::Catalog).text().not_null())
                    .col(
                        ColumnDef::new(PendingAssets::ConnectorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingAssets::ChangeType).text().not_null())
                    .col(
                        ColumnDef::new(PendingAssets::SourceEventType)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingAssets::AssetId).text().not_null())
                    .col(
                        ColumnDef::new(PendingAssets::AssetData)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PendingAssets::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PendingAssets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PendingAssets::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pending_assets_connector_id")
                            .from(PendingAssets::Table, PendingAssets::ConnectorId)
                            .to(Connectors::Table, Connectors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Dedup scan: at most one pending row per (asset_id, connector_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_pending_assets_asset_connector_status")
                    .table(PendingAssets::Table)
                    .col(PendingAssets::AssetId)
                    .col(PendingAssets::ConnectorId)
                    .col(PendingAssets::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_pending_assets_asset_connector_status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PendingAssets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PendingAssets {
    Table,
    Id,
    Name,
    AssetType,
    Catalog,
    ConnectorId,
    ChangeType,
    SourceEventType,
    AssetId,
    AssetData,
    Status,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveIden)]
enum Connectors {
    Table,
    Id,
}
