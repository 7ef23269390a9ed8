use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ledger lines per item, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_transactions_item_created")
                    .table(StockTransactions::Table)
                    .col(StockTransactions::ItemId)
                    .col((StockTransactions::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Pending-queue scans and per-user request listings
        manager
            .create_index(
                Index::create()
                    .name("idx_borrow_requests_status")
                    .table(BorrowRequests::Table)
                    .col(BorrowRequests::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_borrow_requests_user_id")
                    .table(BorrowRequests::Table)
                    .col(BorrowRequests::UserId)
                    .to_owned(),
            )
            .await?;

        // Open borrowings per user and per item
        manager
            .create_index(
                Index::create()
                    .name("idx_borrowings_user_id")
                    .table(Borrowings::Table)
                    .col(Borrowings::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_borrowings_item_id")
                    .table(Borrowings::Table)
                    .col(Borrowings::ItemId)
                    .to_owned(),
            )
            .await?;

        // Allocations per item and per project
        manager
            .create_index(
                Index::create()
                    .name("idx_allocations_item_id")
                    .table(Allocations::Table)
                    .col(Allocations::ItemId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_allocations_project_id")
                    .table(Allocations::Table)
                    .col(Allocations::ProjectId)
                    .to_owned(),
            )
            .await?;

        // Audit trail is read newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_history_entries_created")
                    .table(HistoryEntries::Table)
                    .col((HistoryEntries::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all indexes in reverse order
        manager
            .drop_index(Index::drop().name("idx_history_entries_created").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_allocations_project_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_allocations_item_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_borrowings_item_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_borrowings_user_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_borrow_requests_user_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_borrow_requests_status").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stock_transactions_item_created")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

// Table identifiers
#[derive(Iden)]
enum StockTransactions {
    Table,
    ItemId,
    CreatedAt,
}

#[derive(Iden)]
enum BorrowRequests {
    Table,
    Status,
    UserId,
}

#[derive(Iden)]
enum Borrowings {
    Table,
    UserId,
    ItemId,
}

#[derive(Iden)]
enum Allocations {
    Table,
    ItemId,
    ProjectId,
}

#[derive(Iden)]
enum HistoryEntries {
    Table,
    CreatedAt,
}
