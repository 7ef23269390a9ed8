use crate::{
    auth::Actor,
    entities::allocation::{self, ActiveModel as AllocationActiveModel, Entity as AllocationEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, audit, Ledger},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAllocationRequest {
    pub item_id: Uuid,
    /// Project or competition the units are parked for.
    pub project_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub project_id: Uuid,
    pub quantity: i32,
    pub allocated_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<allocation::Model> for AllocationResponse {
    fn from(model: allocation::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            project_id: model.project_id,
            quantity: model.quantity,
            allocated_by: model.allocated_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AllocationListResponse {
    pub allocations: Vec<AllocationResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Reservations of stock for projects. Allocating moves units out of the
/// on-hand count; revoking the allocation adds them back.
#[derive(Clone)]
pub struct AllocationService {
    ledger: Ledger,
    event_sender: Option<Arc<EventSender>>,
}

impl AllocationService {
    pub fn new(ledger: Ledger, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, item_id = %request.item_id, quantity = request.quantity))]
    pub async fn allocate(
        &self,
        actor: &Actor,
        request: CreateAllocationRequest,
    ) -> Result<AllocationResponse, ServiceError> {
        actor.require_admin()?;
        request.validate()?;

        let actor = actor.clone();
        let allocation = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let item = ledger::item_for_update(txn, request.item_id).await?;
                    let name = item.name.clone();
                    ledger::apply_stock_delta(txn, item, -request.quantity).await?;

                    let allocation = AllocationActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(request.item_id),
                        project_id: Set(request.project_id),
                        quantity: Set(request.quantity),
                        allocated_by: Set(actor.user_id),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::ALLOCATE_RESOURCE,
                        format!(
                            "Allocated {} x '{}' to project {}",
                            allocation.quantity, name, allocation.project_id
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>(allocation)
                })
            })
            .await?;

        info!(allocation_id = %allocation.id, "Resource allocated");

        if let Some(event_sender) = &self.event_sender {
            let event = Event::ResourceAllocated {
                allocation_id: allocation.id,
                item_id: allocation.item_id,
                project_id: allocation.project_id,
                quantity: allocation.quantity,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, allocation_id = %allocation.id, "Failed to send allocation event");
            }
        }

        Ok(allocation.into())
    }

    /// Revokes an allocation and restores its units. The restore is
    /// additive on the current quantity, whatever issues or returns
    /// happened since the allocation was made.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, allocation_id = %allocation_id))]
    pub async fn deallocate(
        &self,
        actor: &Actor,
        allocation_id: Uuid,
    ) -> Result<(), ServiceError> {
        actor.require_admin()?;

        let actor = actor.clone();
        let item_id = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    // Row lock so two revocations of the same allocation
                    // cannot both restore stock; the loser sees NotFound.
                    let allocation = AllocationEntity::find_by_id(allocation_id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Allocation {} not found",
                                allocation_id
                            ))
                        })?;

                    let item = ledger::item_for_update(txn, allocation.item_id).await?;
                    let name = item.name.clone();
                    ledger::apply_stock_delta(txn, item, allocation.quantity).await?;

                    let item_id = allocation.item_id;
                    let project_id = allocation.project_id;
                    let quantity = allocation.quantity;
                    allocation.delete(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::ALLOCATE_RESOURCE_REVOKE,
                        format!(
                            "Revoked allocation of {} x '{}' from project {}",
                            quantity, name, project_id
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>(item_id)
                })
            })
            .await?;

        info!(allocation_id = %allocation_id, "Allocation revoked");

        if let Some(event_sender) = &self.event_sender {
            let event = Event::ResourceDeallocated {
                allocation_id,
                item_id,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, allocation_id = %allocation_id, "Failed to send deallocation event");
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(allocation_id = %allocation_id))]
    pub async fn get_allocation(
        &self,
        allocation_id: Uuid,
    ) -> Result<AllocationResponse, ServiceError> {
        let db = self.ledger.pool();

        let allocation = AllocationEntity::find_by_id(allocation_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, allocation_id = %allocation_id, "Failed to fetch allocation");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Allocation {} not found", allocation_id))
            })?;

        Ok(allocation.into())
    }

    #[instrument(skip(self))]
    pub async fn list_allocations(
        &self,
        page: u64,
        per_page: u64,
        item_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<AllocationListResponse, ServiceError> {
        let db = self.ledger.pool();
        let page = page.max(1);

        let mut query = AllocationEntity::find();
        if let Some(item_id) = item_id {
            query = query.filter(allocation::Column::ItemId.eq(item_id));
        }
        if let Some(project_id) = project_id {
            query = query.filter(allocation::Column::ProjectId.eq(project_id));
        }

        let paginator = query
            .order_by_desc(allocation::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count allocations");
            ServiceError::DatabaseError(e)
        })?;

        let allocations = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch allocations page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(AllocationListResponse {
            allocations: allocations
                .into_iter()
                .map(AllocationResponse::from)
                .collect(),
            total,
            page,
            per_page,
        })
    }
}
