use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create history_entries table: the append-only audit trail. username
        // is snapshotted so entries stay readable after an account disappears.
        manager
            .create_table(
                Table::create()
                    .table(HistoryEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HistoryEntries::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HistoryEntries::UserId).uuid().null())
                    .col(
                        ColumnDef::new(HistoryEntries::Username)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HistoryEntries::Action).string().not_null())
                    .col(ColumnDef::new(HistoryEntries::Details).text().not_null())
                    .col(
                        ColumnDef::new(HistoryEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop history_entries table
        manager
            .drop_table(Table::drop().table(HistoryEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HistoryEntries {
    Table,
    Id,
    UserId,
    Username,
    Action,
    Details,
    CreatedAt,
}
