use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Remaining units at or below which a stock warning is logged.
const LOW_STOCK_THRESHOLD: i32 = 3;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Events published after a unit of work commits. They are advisory; the
// in-transaction history entries are the durable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Item events
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemDeleted(Uuid),

    // Stock ledger events
    StockIssued {
        item_id: Uuid,
        quantity: i32,
        remaining: i32,
    },
    StockReturned {
        item_id: Uuid,
        quantity: i32,
        remaining: i32,
    },

    // Borrow request events
    RequestSubmitted(Uuid),
    RequestApproved {
        request_id: Uuid,
        borrowing_id: Uuid,
    },
    RequestRejected(Uuid),
    RequestCancelled(Uuid),

    // Borrowing events
    BorrowingOpened {
        borrowing_id: Uuid,
        item_id: Option<Uuid>,
    },
    BorrowingClosed(Uuid),

    // Allocation events
    ResourceAllocated {
        allocation_id: Uuid,
        item_id: Uuid,
        project_id: Uuid,
        quantity: i32,
    },
    ResourceDeallocated {
        allocation_id: Uuid,
        item_id: Uuid,
    },
}

// Function to process incoming events published by the services.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::StockIssued {
                item_id,
                quantity,
                remaining,
            } => {
                handle_stock_moved(item_id, -quantity, remaining);
            }
            Event::StockReturned {
                item_id,
                quantity,
                remaining,
            } => {
                handle_stock_moved(item_id, quantity, remaining);
            }
            Event::RequestApproved {
                request_id,
                borrowing_id,
            } => {
                info!(
                    "Request {} approved, borrowing {} opened",
                    request_id, borrowing_id
                );
            }
            Event::BorrowingClosed(borrowing_id) => {
                info!("Borrowing {} closed", borrowing_id);
            }
            Event::ResourceAllocated {
                allocation_id,
                item_id,
                project_id,
                quantity,
            } => {
                info!(
                    "Allocation {} parked {} units of item {} for project {}",
                    allocation_id, quantity, item_id, project_id
                );
            }
            _ => {
                info!("No specific handler for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

// Handler functions for specific events
fn handle_stock_moved(item_id: Uuid, delta: i32, remaining: i32) {
    info!(
        "Stock for item {} moved by {}, {} remaining",
        item_id, delta, remaining
    );

    if remaining <= LOW_STOCK_THRESHOLD {
        warn!(
            "Low inventory alert: item {} has only {} units remaining",
            item_id, remaining
        );
        // Restocking is handled by lab staff; the alert is all we do here
    }
}
