pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_items_table;
mod m20250301_000002_create_stock_transactions_table;
mod m20250301_000003_create_borrow_requests_table;
mod m20250301_000004_create_borrowings_table;
mod m20250301_000005_create_allocations_table;
mod m20250301_000006_create_history_entries_table;
mod m20250420_000007_add_ledger_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_items_table::Migration),
            Box::new(m20250301_000002_create_stock_transactions_table::Migration),
            Box::new(m20250301_000003_create_borrow_requests_table::Migration),
            Box::new(m20250301_000004_create_borrowings_table::Migration),
            Box::new(m20250301_000005_create_allocations_table::Migration),
            Box::new(m20250301_000006_create_history_entries_table::Migration),
            Box::new(m20250420_000007_add_ledger_indexes::Migration),
        ]
    }
}
