use uuid::Uuid;

use crate::errors::ServiceError;

/// Validates a stock delta against the on-hand quantity and returns the
/// quantity the item would have after applying it.
///
/// `delta` is negative for consumption (issue, allocate, tracked borrow)
/// and positive for restoration (return, deallocate, close). The check is
/// pure: callers read `on_hand` inside the transaction that will write the
/// result, so the value cannot be stale.
pub fn reserve(item_id: Uuid, on_hand: i32, delta: i32) -> Result<i32, ServiceError> {
    if delta == 0 {
        return Err(ServiceError::InvalidInput(format!(
            "Stock change for item {} must be non-zero",
            item_id
        )));
    }

    let new_quantity = on_hand.checked_add(delta).ok_or_else(|| {
        ServiceError::InvalidInput(format!("Stock change for item {} overflows", item_id))
    })?;

    if new_quantity < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "Item {} has {} on hand, cannot remove {}",
            item_id,
            on_hand,
            delta.unsigned_abs()
        )));
    }

    Ok(new_quantity)
}
