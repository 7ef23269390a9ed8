use crate::{
    auth::Actor,
    entities::allocation::{self, Entity as AllocationEntity},
    entities::borrowing::{self, Entity as BorrowingEntity},
    entities::item::{self, ActiveModel as ItemActiveModel, Entity as ItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, audit, Ledger},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(
        min = 1,
        max = 120,
        message = "Item name must be between 1 and 120 characters"
    ))]
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Opening stock. Later changes go through issue/return, never here.
    #[validate(range(min = 0, message = "Initial quantity cannot be negative"))]
    #[serde(default)]
    pub initial_quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(
        min = 1,
        max = 120,
        message = "Item name must be between 1 and 120 characters"
    ))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<item::Model> for ItemResponse {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            location: model.location,
            quantity: model.quantity,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Inventory item management. Quantity is only touched here at creation;
/// every later stock movement goes through the issuance, borrowing or
/// allocation services.
#[derive(Clone)]
pub struct ItemService {
    ledger: Ledger,
    event_sender: Option<Arc<EventSender>>,
}

impl ItemService {
    pub fn new(ledger: Ledger, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, name = %request.name))]
    pub async fn create_item(
        &self,
        actor: &Actor,
        request: CreateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        actor.require_admin()?;
        request.validate()?;

        let actor = actor.clone();
        let item = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let model = ItemActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(request.name),
                        description: Set(request.description),
                        location: Set(request.location),
                        quantity: Set(request.initial_quantity),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::ITEM_CREATED,
                        format!(
                            "Created item '{}' with {} units",
                            model.name, model.quantity
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>(model)
                })
            })
            .await?;

        info!(item_id = %item.id, "Item created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ItemCreated(item.id)).await {
                warn!(error = %e, item_id = %item.id, "Failed to send item created event");
            }
        }

        Ok(item.into())
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        actor.require_admin()?;
        request.validate()?;

        let actor = actor.clone();
        let item = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let existing = ItemEntity::find_by_id(item_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Item {} not found", item_id))
                        })?;

                    let mut active: ItemActiveModel = existing.into();
                    if let Some(name) = request.name {
                        active.name = Set(name);
                    }
                    if let Some(description) = request.description {
                        active.description = Set(Some(description));
                    }
                    if let Some(location) = request.location {
                        active.location = Set(Some(location));
                    }
                    let updated = active.update(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::ITEM_UPDATED,
                        format!("Updated item '{}'", updated.name),
                    )
                    .await?;

                    Ok::<_, ServiceError>(updated)
                })
            })
            .await?;

        info!(item_id = %item.id, "Item updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ItemUpdated(item.id)).await {
                warn!(error = %e, item_id = %item.id, "Failed to send item updated event");
            }
        }

        Ok(item.into())
    }

    /// Deletes an item. Refused while allocations or open tracked
    /// borrowings still reference it, so no reserved or loaned stock can
    /// silently disappear.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, item_id = %item_id))]
    pub async fn delete_item(&self, actor: &Actor, item_id: Uuid) -> Result<(), ServiceError> {
        actor.require_admin()?;

        let actor = actor.clone();
        self.ledger
            .run(move |txn| {
                Box::pin(async move {
                    let existing = ledger::item_for_update(txn, item_id).await?;

                    let live_allocations = AllocationEntity::find()
                        .filter(allocation::Column::ItemId.eq(item_id))
                        .count(txn)
                        .await?;
                    if live_allocations > 0 {
                        return Err(ServiceError::InvalidState(format!(
                            "Item {} still has {} active allocations",
                            item_id, live_allocations
                        )));
                    }

                    let open_borrowings = BorrowingEntity::find()
                        .filter(borrowing::Column::ItemId.eq(item_id))
                        .filter(borrowing::Column::ReturnedAt.is_null())
                        .count(txn)
                        .await?;
                    if open_borrowings > 0 {
                        return Err(ServiceError::InvalidState(format!(
                            "Item {} still has {} open borrowings",
                            item_id, open_borrowings
                        )));
                    }

                    let name = existing.name.clone();
                    existing.delete(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::ITEM_DELETED,
                        format!("Deleted item '{}'", name),
                    )
                    .await?;

                    Ok::<_, ServiceError>(())
                })
            })
            .await?;

        info!(item_id = %item_id, "Item deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::ItemDeleted(item_id)).await {
                warn!(error = %e, item_id = %item_id, "Failed to send item deleted event");
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<ItemResponse, ServiceError> {
        let db = self.ledger.pool();

        let item = ItemEntity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, item_id = %item_id, "Failed to fetch item");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        Ok(item.into())
    }

    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ItemListResponse, ServiceError> {
        let db = self.ledger.pool();
        let page = page.max(1);

        let paginator = ItemEntity::find()
            .order_by_desc(item::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count items");
            ServiceError::DatabaseError(e)
        })?;

        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch items page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(ItemListResponse {
            items: items.into_iter().map(ItemResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }
}
