//! Audit trail writer. Entries are inserted inside the same unit of work
//! as the change they describe, so a failed insert aborts the whole unit.

use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::history_entry;
use crate::errors::ServiceError;

pub const ITEM_CREATED: &str = "ITEM_CREATED";
pub const ITEM_UPDATED: &str = "ITEM_UPDATED";
pub const ITEM_DELETED: &str = "ITEM_DELETED";
pub const ITEM_ISSUED: &str = "ITEM_ISSUED";
pub const RETURN_ITEM: &str = "RETURN_ITEM";
pub const REQUEST_SUBMITTED: &str = "REQUEST_SUBMITTED";
pub const REQUEST_APPROVED: &str = "REQUEST_APPROVED";
pub const REQUEST_REJECTED: &str = "REQUEST_REJECTED";
pub const REQUEST_CANCELLED: &str = "REQUEST_CANCELLED";
pub const BORROWING_CREATED: &str = "BORROWING_CREATED";
pub const BORROWING_RETURNED: &str = "BORROWING_RETURNED";
pub const ALLOCATE_RESOURCE: &str = "ALLOCATE_RESOURCE";
pub const ALLOCATE_RESOURCE_REVOKE: &str = "ALLOCATE_RESOURCE_REVOKE";

/// Writes one history entry on the given connection. The username is
/// snapshotted from the actor so the trail survives account removal.
pub async fn record<C>(
    conn: &C,
    actor: &Actor,
    action: &str,
    details: String,
) -> Result<history_entry::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let entry = history_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(actor.user_id)),
        username: Set(actor.username.clone()),
        action: Set(action.to_string()),
        details: Set(details),
        ..Default::default()
    };
    let saved = entry.insert(conn).await?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn records_action_with_username_snapshot() {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = establish_connection_with_config(&config)
            .await
            .expect("connect");
        run_migrations(&pool).await.expect("migrate");

        let actor = Actor::new(Uuid::new_v4(), "svasquez", Role::Admin);
        let saved = record(&pool, &actor, ITEM_ISSUED, "issued 3 units".to_string())
            .await
            .expect("record");

        let found = history_entry::Entity::find_by_id(saved.id)
            .one(&pool)
            .await
            .expect("query")
            .expect("entry");
        assert_eq!(found.username, "svasquez");
        assert_eq!(found.user_id, Some(actor.user_id));
        assert_eq!(found.action, ITEM_ISSUED);
        assert_eq!(found.details, "issued 3 units");
    }
}
