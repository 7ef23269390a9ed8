//! Unit-of-work layer for the stock ledger.
//!
//! Every mutation of an item's quantity goes through [`Ledger::run`]: the
//! guard check, the quantity update, the paired domain record and the
//! audit entry all land in one database transaction, or none of them do.

pub mod audit;
pub mod guard;

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, DbErr, EntityTrait, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::item;
use crate::errors::ServiceError;

/// Entry point for ledger units of work.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: Arc<DbPool>,
}

impl Ledger {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// The connection pool, for read paths that need no unit of work.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Runs a unit of work inside a single database transaction.
    ///
    /// The closure's error rolls back every write made so far; `Ok`
    /// commits them together. Connection-level failures surface as
    /// `E::from(DbErr)`.
    pub async fn run<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, E>> + Send,
        T: Send + 'static,
        E: From<DbErr> + Send + 'static + std::error::Error,
    {
        let db = &*self.pool;
        let unit_id = Uuid::new_v4();
        let start = Instant::now();

        debug!(unit_id = %unit_id, "Starting ledger unit of work");
        counter!("labstock_db.transaction.started", 1);

        let result = db
            .transaction(move |txn| {
                let future = f(txn);
                Box::pin(async move {
                    let result = future.await;
                    debug!(unit_id = %unit_id, "Unit of work completed");
                    result
                })
            })
            .await;

        let elapsed = start.elapsed();
        histogram!(
            "labstock_db.transaction.duration_ms",
            elapsed.as_secs_f64() * 1000.0
        );

        match &result {
            Ok(_) => {
                counter!("labstock_db.transaction.committed", 1);
                debug!(unit_id = %unit_id, "Unit of work committed in {:?}", elapsed);
            }
            Err(_) => {
                counter!("labstock_db.transaction.rolled_back", 1);
                warn!(unit_id = %unit_id, "Unit of work rolled back after {:?}", elapsed);
            }
        }

        result.map_err(|e| match e {
            sea_orm::TransactionError::Connection(e) => E::from(e),
            sea_orm::TransactionError::Transaction(e) => e,
        })
    }
}

/// Reads an item inside the current transaction, holding a row lock until
/// the unit commits or rolls back. Racing units on the same item serialize
/// here, so the quantity each one observes is the quantity it mutates.
pub async fn item_for_update(
    txn: &DatabaseTransaction,
    item_id: Uuid,
) -> Result<item::Model, ServiceError> {
    item::Entity::find_by_id(item_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
}

/// Validates `delta` against the locked item and writes the new quantity.
/// The caller still has to insert the paired record and the audit entry
/// before the unit commits.
pub async fn apply_stock_delta(
    txn: &DatabaseTransaction,
    item: item::Model,
    delta: i32,
) -> Result<item::Model, ServiceError> {
    let new_quantity = guard::reserve(item.id, item.quantity, delta)?;
    let mut active: item::ActiveModel = item.into();
    active.quantity = Set(new_quantity);
    let updated = active.update(txn).await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use sea_orm::PaginatorTrait;

    async fn test_ledger() -> Ledger {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            // One connection: each in-memory SQLite connection is its own
            // database, so the migration and the unit must share it.
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = establish_connection_with_config(&config)
            .await
            .expect("connect");
        run_migrations(&pool).await.expect("migrate");
        Ledger::new(Arc::new(pool))
    }

    fn sample_item() -> item::ActiveModel {
        item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Soldering iron".to_string()),
            description: Set(None),
            location: Set(Some("B2".to_string())),
            quantity: Set(4),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn commits_when_the_unit_succeeds() {
        let ledger = test_ledger().await;
        let item_id = ledger
            .run(|txn| {
                Box::pin(async move {
                    let inserted = sample_item().insert(txn).await?;
                    Ok::<_, ServiceError>(inserted.id)
                })
            })
            .await
            .expect("unit should commit");

        let found = item::Entity::find_by_id(item_id)
            .one(ledger.pool())
            .await
            .expect("query");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn rolls_back_every_write_when_the_unit_fails() {
        let ledger = test_ledger().await;
        let result: Result<(), ServiceError> = ledger
            .run(|txn| {
                Box::pin(async move {
                    sample_item().insert(txn).await?;
                    Err(ServiceError::InvalidInput("late failure".into()))
                })
            })
            .await;

        assert!(result.is_err());
        let count = item::Entity::find()
            .count(ledger.pool())
            .await
            .expect("count");
        assert_eq!(count, 0, "failed unit must leave no rows behind");
    }

    #[tokio::test]
    async fn locked_read_maps_missing_item_to_not_found() {
        let ledger = test_ledger().await;
        let missing = Uuid::new_v4();
        let result: Result<(), ServiceError> = ledger
            .run(move |txn| {
                Box::pin(async move {
                    item_for_update(txn, missing).await?;
                    Ok(())
                })
            })
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn stock_delta_rejects_overdraw_without_touching_the_row() {
        let ledger = test_ledger().await;
        let item_id = ledger
            .run(|txn| {
                Box::pin(async move {
                    let inserted = sample_item().insert(txn).await?;
                    Ok::<_, ServiceError>(inserted.id)
                })
            })
            .await
            .expect("seed");

        let result: Result<(), ServiceError> = ledger
            .run(move |txn| {
                Box::pin(async move {
                    let locked = item_for_update(txn, item_id).await?;
                    apply_stock_delta(txn, locked, -5).await?;
                    Ok(())
                })
            })
            .await;
        assert!(matches!(result, Err(ServiceError::InsufficientStock(_))));

        let after = item::Entity::find_by_id(item_id)
            .one(ledger.pool())
            .await
            .expect("query")
            .expect("item");
        assert_eq!(after.quantity, 4);
    }
}
