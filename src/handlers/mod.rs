pub mod allocations;
pub mod borrowings;
pub mod items;
pub mod requests;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::ledger::Ledger;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<crate::services::items::ItemService>,
    pub issuance: Arc<crate::services::issuance::IssuanceService>,
    pub requests: Arc<crate::services::requests::RequestService>,
    pub borrowings: Arc<crate::services::borrowings::BorrowingService>,
    pub allocations: Arc<crate::services::allocations::AllocationService>,
}

impl AppServices {
    /// Builds the service container. All services share one ledger over
    /// the same pool, so every unit of work sees the same database.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        let ledger = Ledger::new(db_pool);

        Self {
            items: Arc::new(crate::services::items::ItemService::new(
                ledger.clone(),
                event_sender.clone(),
            )),
            issuance: Arc::new(crate::services::issuance::IssuanceService::new(
                ledger.clone(),
                event_sender.clone(),
            )),
            requests: Arc::new(crate::services::requests::RequestService::new(
                ledger.clone(),
                event_sender.clone(),
            )),
            borrowings: Arc::new(crate::services::borrowings::BorrowingService::new(
                ledger.clone(),
                event_sender.clone(),
            )),
            allocations: Arc::new(crate::services::allocations::AllocationService::new(
                ledger,
                event_sender,
            )),
        }
    }
}
