use crate::{
    auth::Actor,
    entities::stock_transaction::{
        self, ActiveModel as StockTransactionActiveModel, StockDirection,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, audit, Ledger},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct StockMovementRequest {
    /// Member receiving (issue) or handing back (return) the units.
    pub user_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockMovementResponse {
    pub transaction_id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub direction: String,
    pub quantity: i32,
    /// On-hand quantity after the movement committed.
    pub remaining: i32,
    pub created_at: DateTime<Utc>,
}

impl StockMovementResponse {
    fn from_parts(transaction: stock_transaction::Model, remaining: i32) -> Self {
        Self {
            transaction_id: transaction.id,
            item_id: transaction.item_id,
            user_id: transaction.user_id,
            direction: transaction.direction.to_string(),
            quantity: transaction.quantity,
            remaining,
            created_at: transaction.created_at,
        }
    }
}

/// Direct issue and return of stock. Each movement is one unit of work:
/// guard check, quantity write, transaction row and audit entry commit
/// together or not at all.
#[derive(Clone)]
pub struct IssuanceService {
    ledger: Ledger,
    event_sender: Option<Arc<EventSender>>,
}

impl IssuanceService {
    pub fn new(ledger: Ledger, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, item_id = %item_id, quantity = request.quantity))]
    pub async fn issue(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: StockMovementRequest,
    ) -> Result<StockMovementResponse, ServiceError> {
        actor.require_admin()?;
        request.validate()?;

        let response = self
            .apply_movement(actor, item_id, request, StockDirection::Issue)
            .await?;

        info!(
            transaction_id = %response.transaction_id,
            remaining = response.remaining,
            "Stock issued"
        );

        if let Some(event_sender) = &self.event_sender {
            let event = Event::StockIssued {
                item_id,
                quantity: response.quantity,
                remaining: response.remaining,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, item_id = %item_id, "Failed to send stock issued event");
            }
        }

        Ok(response)
    }

    #[instrument(skip(self, actor, request), fields(actor = %actor.user_id, item_id = %item_id, quantity = request.quantity))]
    pub async fn return_stock(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: StockMovementRequest,
    ) -> Result<StockMovementResponse, ServiceError> {
        actor.require_admin()?;
        request.validate()?;

        let response = self
            .apply_movement(actor, item_id, request, StockDirection::Return)
            .await?;

        info!(
            transaction_id = %response.transaction_id,
            remaining = response.remaining,
            "Stock returned"
        );

        if let Some(event_sender) = &self.event_sender {
            let event = Event::StockReturned {
                item_id,
                quantity: response.quantity,
                remaining: response.remaining,
            };
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, item_id = %item_id, "Failed to send stock returned event");
            }
        }

        Ok(response)
    }

    async fn apply_movement(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: StockMovementRequest,
        direction: StockDirection,
    ) -> Result<StockMovementResponse, ServiceError> {
        let actor = actor.clone();
        let quantity = request.quantity;
        let recipient = request.user_id;
        let delta = direction.signum() * quantity;
        let action = match direction {
            StockDirection::Issue => audit::ITEM_ISSUED,
            StockDirection::Return => audit::RETURN_ITEM,
        };

        let (transaction, remaining) = self
            .ledger
            .run(move |txn| {
                Box::pin(async move {
                    let item = ledger::item_for_update(txn, item_id).await?;
                    let updated = ledger::apply_stock_delta(txn, item, delta).await?;

                    let transaction = StockTransactionActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item_id),
                        user_id: Set(recipient),
                        direction: Set(direction),
                        quantity: Set(quantity),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    let verb = match direction {
                        StockDirection::Issue => "Issued",
                        StockDirection::Return => "Returned",
                    };
                    audit::record(
                        txn,
                        &actor,
                        action,
                        format!(
                            "{} {} x '{}' for user {}",
                            verb, quantity, updated.name, recipient
                        ),
                    )
                    .await?;

                    Ok::<_, ServiceError>((transaction, updated.quantity))
                })
            })
            .await?;

        Ok(StockMovementResponse::from_parts(transaction, remaining))
    }
}
