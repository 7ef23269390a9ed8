use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create stock_transactions table: one append-only row per stock
        // movement, written in the same transaction as the quantity change.
        manager
            .create_table(
                Table::create()
                    .table(StockTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::ItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::Direction)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transactions_item_id")
                            .from(StockTransactions::Table, StockTransactions::ItemId)
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
        // Drop stock_transactions table
        manager
            .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StockTransactions {
    Table,
    Id,
    ItemId,
    UserId,
    Direction,
    Quantity,
    CreatedAt,
}
