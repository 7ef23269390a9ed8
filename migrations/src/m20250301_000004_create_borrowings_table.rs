use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create borrowings table. item_id is nullable on purpose: a borrowing
        // produced by an approved request tracks a free-text tool and moves no
        // stock, while a direct borrowing is pinned to an inventory item.
        manager
            .create_table(
                Table::create()
                    .table(Borrowings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Borrowings::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Borrowings::UserId).uuid().not_null())
                    .col(ColumnDef::new(Borrowings::RequestId).uuid().null())
                    .col(ColumnDef::new(Borrowings::ItemId).uuid().null())
                    .col(ColumnDef::new(Borrowings::Tool).string().not_null())
                    .col(
                        ColumnDef::new(Borrowings::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Borrowings::BorrowedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Borrowings::ExpectedReturn).date().null())
                    .col(
                        ColumnDef::new(Borrowings::ReturnedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Borrowings::Notes).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_borrowings_request_id")
                            .from(Borrowings::Table, Borrowings::RequestId)
                            .to(
                                super::m20250301_000003_create_borrow_requests_table::BorrowRequests::Table,
                                super::m20250301_000003_create_borrow_requests_table::BorrowRequests::Id,
                            )
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_borrowings_item_id")
                            .from(Borrowings::Table, Borrowings::ItemId)
                            .to(
                                super::m20250301_000001_create_items_table::Items::Table,
                                super::m20250301_000001_create_items_table::Items::Id,
                            )
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop borrowings table
        manager
            .drop_table(Table::drop().table(Borrowings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Borrowings {
    Table,
    Id,
    UserId,
    RequestId,
    ItemId,
    Tool,
    Quantity,
    BorrowedAt,
    ExpectedReturn,
    ReturnedAt,
    Notes,
}
