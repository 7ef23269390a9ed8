use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create allocations table: stock parked against a project. Rows are
        // deleted again on deallocation, so there is no status column.
        manager
            .create_table(
                Table::create()
                    .table(Allocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Allocations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Allocations::ItemId).uuid().not_null())
                    .col(ColumnDef::new(Allocations::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(Allocations::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Allocations::AllocatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Allocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allocations_item_id")
                            .from(Allocations::Table, Allocations::ItemId)
                            .to(
                                super::m20250301_000001_create_items_table::Items::Table,
                                super::m20250301_000001_create_items_table::Items::Id,
                            )
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop allocations table
        manager
            .drop_table(Table::drop().table(Allocations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Allocations {
    Table,
    Id,
    ItemId,
    ProjectId,
    Quantity,
    AllocatedBy,
    CreatedAt,
}
