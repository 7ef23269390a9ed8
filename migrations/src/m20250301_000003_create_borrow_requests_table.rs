use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create borrow_requests table
        manager
            .create_table(
                Table::create()
                    .table(BorrowRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BorrowRequests::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BorrowRequests::UserId).uuid().not_null())
                    .col(ColumnDef::new(BorrowRequests::Title).string().not_null())
                    .col(ColumnDef::new(BorrowRequests::Tool).string().not_null())
                    .col(
                        ColumnDef::new(BorrowRequests::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(BorrowRequests::Reason).text().null())
                    .col(
                        ColumnDef::new(BorrowRequests::ExpectedReturn)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BorrowRequests::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(BorrowRequests::ResolvedBy).uuid().null())
                    .col(
                        ColumnDef::new(BorrowRequests::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BorrowRequests::ResolutionReason)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BorrowRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop borrow_requests table
        manager
            .drop_table(Table::drop().table(BorrowRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum BorrowRequests {
    Table,
    Id,
    UserId,
    Title,
    Tool,
    Quantity,
    Reason,
    ExpectedReturn,
    Status,
    ResolvedBy,
    ResolvedAt,
    ResolutionReason,
    CreatedAt,
}
