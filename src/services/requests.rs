use crate::{
    auth::Actor,
    entities::borrow_request::{
        self, ActiveModel as BorrowRequestActiveModel, Entity as BorrowRequestEntity,
        RequestStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{audit, Ledger},
    services::borrowings::{insert_borrowing, BorrowingResponse, NewBorrowing},
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
pub struct SubmitBorrowRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Request title must be between 1 and 200 characters"
    ))]
    pub title: String,
    #[validate(length(min = 1, message = "Tool name is required"))]
    pub tool: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub reason: Option<String>,
    pub expected_return: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ResolutionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequestResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub tool: String,
    pub quantity: i32,
    pub reason: Option<String>,
    pub expected_return: Option<NaiveDate>,
    pub status: String,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<borrow_request::Model> for BorrowRequestResponse {
    fn from(model: borrow_request::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            tool: model.tool,
            quantity: model.quantity,
            reason: model.reason,
            expected_return: model.expected_return,
            status: model.status.to_string(),
            resolved_by: model.resolved_by,
            resolved_at: model.resolved_at,
            resolution_reason: model.resolution_reason,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequestListResponse {
    pub requests: Vec<BorrowRequestResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApprovalResponse {
    pub request: BorrowRequestResponse,
    pub borrowing: BorrowingResponse,
}

/// Only pending requests may be resolved; every other status is terminal.
fn ensure_pending(request_id: Uuid, status: RequestStatus) -> Result<(), ServiceError> {
    if status.is_pending() {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(format!(
            "Request {} is already {}",
            request_id, status
        )))
    }
}

/// Reads a request inside the current transaction with a row lock, so
/// racing resolutions serialize and exactly one of them sees `pending`.
async fn request_for_update(
    txn: &DatabaseTransaction,
    request_id: Uuid,
) -> Result<borrow_request::Model, ServiceError> {
    BorrowRequestEntity::find_by_id(request_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", request_id)))
}

/// Borrow request lifecycle: submit, then exactly one of approve, reject
/// or cancel. Approval opens an untracked borrowing in the same unit of
/// work; no stock moves because requests name tools, not item ids.
#[derive(Clone)]
pub struct RequestService {
    ledger: Ledger,
    event_sender: Option<Arc<EventSender>>,
}

impl RequestService {
    pub fn new(ledger: Ledger, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, tool = %request.tool))]
    pub async fn submit(
        &self,
        actor: &Actor,
        request: SubmitBorrowRequest,
    ) -> Result<BorrowRequestResponse, ServiceError> {
        request.validate()?;

        let actor = actor.clone();
        let submitted = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let model = BorrowRequestActiveModel {
                        id: Set(Uuid::new_v4()),
                        user_id: Set(actor.user_id),
                        title: Set(request.title),
                        tool: Set(request.tool),
                        quantity: Set(request.quantity),
                        reason: Set(request.reason),
                        expected_return: Set(request.expected_return),
                        status: Set(RequestStatus::Pending),
                        resolved_by: Set(None),
                        resolved_at: Set(None),
                        resolution_reason: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::REQUEST_SUBMITTED,
                        format!(
                            "Requested {} x '{}' ({})",
                            model.quantity, model.tool, model.title
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>(model)
                })
            })
            .await?;

        info!(request_id = %submitted.id, "Borrow request submitted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::RequestSubmitted(submitted.id)).await {
                warn!(error = %e, request_id = %submitted.id, "Failed to send request submitted event");
            }
        }

        Ok(submitted.into())
    }

    #[instrument(skip(self, actor), fields(actor = %actor.user_id, request_id = %request_id))]
    pub async fn approve(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<ApprovalResponse, ServiceError> {
        actor.require_admin()?;

        let actor = actor.clone();
        let (approved, borrowing) = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let request = request_for_update(txn, request_id).await?;
                    ensure_pending(request_id, request.status)?;

                    let borrowing = insert_borrowing(
                        txn,
                        NewBorrowing {
                            user_id: request.user_id,
                            request_id: Some(request.id),
                            item_id: None,
                            tool: request.tool.clone(),
                            quantity: request.quantity,
                            expected_return: request.expected_return,
                            notes: None,
                        },
                    )
                    .await?;

                    let mut active: BorrowRequestActiveModel = request.into();
                    active.status = Set(RequestStatus::Approved);
                    active.resolved_by = Set(Some(actor.user_id));
                    active.resolved_at = Set(Some(Utc::now()));
                    let approved = active.update(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::REQUEST_APPROVED,
                        format!(
                            "Approved request '{}' for user {}, opened borrowing {}",
                            approved.title, approved.user_id, borrowing.id
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>((approved, borrowing))
                })
            })
            .await?;

        info!(request_id = %approved.id, borrowing_id = %borrowing.id, "Request approved");

        if let Some(event_sender) = &self.event_sender {
            let event = Event::RequestApproved {
                request_id: approved.id,
                borrowing_id: borrowing.id,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, request_id = %approved.id, "Failed to send request approved event");
            }
        }

        Ok(ApprovalResponse {
            request: approved.into(),
            borrowing: borrowing.into(),
        })
    }

    #[instrument(skip(self, actor, resolution), fields(actor = %actor.user_id, request_id = %request_id))]
    pub async fn reject(
        &self,
        actor: &Actor,
        request_id: Uuid,
        resolution: ResolutionRequest,
    ) -> Result<BorrowRequestResponse, ServiceError> {
        actor.require_admin()?;

        let actor = actor.clone();
        let rejected = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let request = request_for_update(txn, request_id).await?;
                    ensure_pending(request_id, request.status)?;

                    let mut active: BorrowRequestActiveModel = request.into();
                    active.status = Set(RequestStatus::Rejected);
                    active.resolved_by = Set(Some(actor.user_id));
                    active.resolved_at = Set(Some(Utc::now()));
                    active.resolution_reason = Set(resolution.reason);
                    let rejected = active.update(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::REQUEST_REJECTED,
                        format!(
                            "Rejected request '{}' for user {}",
                            rejected.title, rejected.user_id
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>(rejected)
                })
            })
            .await?;

        info!(request_id = %rejected.id, "Request rejected");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::RequestRejected(rejected.id)).await {
                warn!(error = %e, request_id = %rejected.id, "Failed to send request rejected event");
            }
        }

        Ok(rejected.into())
    }

    #[instrument(skip(self, actor, resolution), fields(actor = %actor.user_id, request_id = %request_id))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        request_id: Uuid,
        resolution: ResolutionRequest,
    ) -> Result<BorrowRequestResponse, ServiceError> {
        let actor = actor.clone();
        let cancelled = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let request = request_for_update(txn, request_id).await?;
                    actor.require_self_or_admin(request.user_id)?;
                    ensure_pending(request_id, request.status)?;

                    let mut active: BorrowRequestActiveModel = request.into();
                    active.status = Set(RequestStatus::Cancelled);
                    active.resolved_by = Set(Some(actor.user_id));
                    active.resolved_at = Set(Some(Utc::now()));
                    active.resolution_reason = Set(resolution.reason);
                    let cancelled = active.update(txn).await?;

                    audit::record(
                        txn,
                        &actor,
                        audit::REQUEST_CANCELLED,
                        format!("Cancelled request '{}'", cancelled.title),
                    )
                    .await?;

                    Ok::<_, ServiceError>(cancelled)
                })
            })
            .await?;

        info!(request_id = %cancelled.id, "Request cancelled");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::RequestCancelled(cancelled.id)).await {
                warn!(error = %e, request_id = %cancelled.id, "Failed to send request cancelled event");
            }
        }

        Ok(cancelled.into())
    }

    #[instrument(skip(self, actor), fields(request_id = %request_id))]
    pub async fn get_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<BorrowRequestResponse, ServiceError> {
        let db = self.ledger.pool();

        let request = BorrowRequestEntity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request_id, "Failed to fetch request");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", request_id)))?;

        actor.require_self_or_admin(request.user_id)?;
        Ok(request.into())
    }

    /// Members see their own requests; admins see everyone's.
    #[instrument(skip(self, actor))]
    pub async fn list_requests(
        &self,
        actor: &Actor,
        page: u64,
        per_page: u64,
        status: Option<RequestStatus>,
        user_id: Option<Uuid>,
    ) -> Result<BorrowRequestListResponse, ServiceError> {
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

        let mut query = BorrowRequestEntity::find();
        if let Some(user_id) = user_filter {
            query = query.filter(borrow_request::Column::UserId.eq(user_id));
        }
        if let Some(status) = status {
            query = query.filter(borrow_request::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(borrow_request::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count requests");
            ServiceError::DatabaseError(e)
        })?;

        let requests = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, "Failed to fetch requests page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(BorrowRequestListResponse {
            requests: requests.into_iter().map(BorrowRequestResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }
}
