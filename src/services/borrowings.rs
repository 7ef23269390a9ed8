use crate::{
    auth::Actor,
    entities::borrowing::{self, ActiveModel as BorrowingActiveModel, Entity as BorrowingEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, audit, Ledger},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowingRequest {
    /// Borrower. Defaults to the caller; only admins may set someone else.
    pub user_id: Option<Uuid>,
    /// Tracked inventory item to borrow from. Stock is decremented at
    /// creation and restored at close.
    pub item_id: Option<Uuid>,
    /// Free-text tool name for untracked gear. Required when `item_id`
    /// is absent; ignored when it is present (the item name wins).
    pub tool: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub expected_return: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub tool: String,
    pub quantity: i32,
    pub borrowed_at: DateTime<Utc>,
    pub expected_return: Option<NaiveDate>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<borrowing::Model> for BorrowingResponse {
    fn from(model: borrowing::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            request_id: model.request_id,
            item_id: model.item_id,
            tool: model.tool,
            quantity: model.quantity,
            borrowed_at: model.borrowed_at,
            expected_return: model.expected_return,
            returned_at: model.returned_at,
            notes: model.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BorrowingListResponse {
    pub borrowings: Vec<BorrowingResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Row to insert for a new loan. Stock effects are the caller's business:
/// the direct borrow path decrements first, the approval path has none.
pub(crate) struct NewBorrowing {
    pub user_id: Uuid,
    pub request_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub tool: String,
    pub quantity: i32,
    pub expected_return: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// The one place a borrowing row is created. Both the direct borrow path
/// and request approval insert through here.
pub(crate) async fn insert_borrowing(
    txn: &DatabaseTransaction,
    new: NewBorrowing,
) -> Result<borrowing::Model, ServiceError> {
    let model = BorrowingActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(new.user_id),
        request_id: Set(new.request_id),
        item_id: Set(new.item_id),
        tool: Set(new.tool),
        quantity: Set(new.quantity),
        expected_return: Set(new.expected_return),
        returned_at: Set(None),
        notes: Set(new.notes),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(model)
}

/// Loans of lab equipment, tracked (stock-backed) or untracked.
#[derive(Clone)]
pub struct BorrowingService {
    ledger: Ledger,
    event_sender: Option<Arc<EventSender>>,
}

impl BorrowingService {
    pub fn new(ledger: Ledger, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, quantity = request.quantity))]
    pub async fn borrow(
        &self,
        actor: &Actor,
        request: CreateBorrowingRequest,
    ) -> Result<BorrowingResponse, ServiceError> {
        request.validate()?;

        let borrower = request.user_id.unwrap_or(actor.user_id);
        actor.require_self_or_admin(borrower)?;

        if request.item_id.is_none() && request.tool.as_deref().map_or(true, str::is_empty) {
            return Err(ServiceError::InvalidInput(
                "Either item_id or a tool name must be provided".to_string(),
            ));
        }

        let actor = actor.clone();
        let borrowing = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let (item_id, tool) = match request.item_id {
                        Some(item_id) => {
                            let item = ledger::item_for_update(txn, item_id).await?;
                            let name = item.name.clone();
                            ledger::apply_stock_delta(txn, item, -request.quantity).await?;
                            (Some(item_id), name)
                        }
                        None => (None, request.tool.unwrap_or_default()),
                    };

                    let borrowing = insert_borrowing(
                        txn,
                        NewBorrowing {
                            user_id: borrower,
                            request_id: None,
                            item_id,
                            tool,
                            quantity: request.quantity,
                            expected_return: request.expected_return,
                            notes: request.notes,
                        },
                    )
                    .await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::BORROWING_CREATED,
                        format!(
                            "User {} borrowed {} x '{}'",
                            borrower, borrowing.quantity, borrowing.tool
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>(borrowing)
                })
            })
            .await?;

        info!(borrowing_id = %borrowing.id, "Borrowing opened");

        if let Some(event_sender) = &self.event_sender {
            let event = Event::BorrowingOpened {
                borrowing_id: borrowing.id,
                item_id: borrowing.item_id,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, borrowing_id = %borrowing.id, "Failed to send borrowing opened event");
            }
        }

        Ok(borrowing.into())
    }

    /// Closes a loan. A borrowing closes exactly once: the second close of
    /// the same borrowing fails with `AlreadyClosed` and restores nothing.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, borrowing_id = %borrowing_id))]
    pub async fn close(
        &self,
        actor: &Actor,
        borrowing_id: Uuid,
    ) -> Result<BorrowingResponse, ServiceError> {
        let actor = actor.clone();
        let closed = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let borrowing = BorrowingEntity::find_by_id(borrowing_id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Borrowing {} not found",
                                borrowing_id
                            ))
                        })?;

                    actor.require_self_or_admin(borrowing.user_id)?;

                    if borrowing.is_closed() {
                        return Err(ServiceError::AlreadyClosed(format!(
                            "Borrowing {} was already returned",
                            borrowing_id
                        )));
                    }

                    if let Some(item_id) = borrowing.item_id {
                        let item = ledger::item_for_update(txn, item_id).await?;
                        ledger::apply_stock_delta(txn, item, borrowing.quantity).await?;
                    }

                    let tool = borrowing.tool.clone();
                    let quantity = borrowing.quantity;
                    let mut active: BorrowingActiveModel = borrowing.into();
                    active.returned_at = Set(Some(Utc::now()));
                    let closed = active.update(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::BORROWING_RETURNED,
                        format!("Returned {} x '{}'", quantity, tool),
                    )
                    .await?;

                    Ok::<_, ServiceError>(closed)
                })
            })
            .await?;

        info!(borrowing_id = %closed.id, "Borrowing closed");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::BorrowingClosed(closed.id)).await {
                warn!(error = %e, borrowing_id = %closed.id, "Failed to send borrowing closed event");
            }
        }

        Ok(closed.into())
    }

    #[instrument(skip(self, actor), fields(borrowing_id = %borrowing_id))]
    pub async fn get_borrowing(
        &self,
        actor: &Actor,
        borrowing_id: Uuid,
    ) -> Result<BorrowingResponse, ServiceError> {
        let db = self.ledger.pool();

        let borrowing = BorrowingEntity::find_by_id(borrowing_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, borrowing_id = %borrowing_id, "Failed to fetch borrowing");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Borrowing {} not found", borrowing_id))
            })?;

        actor.require_self_or_admin(borrowing.user_id)?;
        Ok(borrowing.into())
    }

    /// Members see their own loans; admins see everyone's, optionally
    /// narrowed to one user. `open` filters on whether the loan is closed.
    #[instrument(skip(self, actor))]
    pub async fn list_borrowings(
        &self,
        actor: &Actor,
        page: u64,
        per_page: u64,
        user_id: Option<Uuid>,
        open: Option<bool>,
    ) -> Result<BorrowingListResponse, ServiceError> {
        let db = self.ledger.pool();
        let page = page.max(1);

        let user_filter = match user_id {
            Some(target) => {
                actor.require_self_or_admin(target)?;
                Some(target)
            }
            None if actor.is_admin() => None,
            None => Some(actor.user_id),
        };

        let mut query = BorrowingEntity::find();
        if let Some(user_id) = user_filter {
            query = query.filter(borrowing::Column::UserId.eq(user_id));
        }
        match open {
            Some(true) => query = query.filter(borrowing::Column::ReturnedAt.is_null()),
            Some(false) => query = query.filter(borrowing::Column::ReturnedAt.is_not_null()),
            None => {}
        }

        let paginator = query
            .order_by_desc(borrowing::Column::BorrowedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count borrowings");
            ServiceError::DatabaseError(e)
        })?;

        let borrowings = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch borrowings page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(BorrowingListResponse {
            borrowings: borrowings.into_iter().map(BorrowingResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }
}
