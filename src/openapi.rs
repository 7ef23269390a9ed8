use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Labstock API",
        version = "0.3.1",
        description = r#"
# Labstock Inventory API

Inventory and equipment-loan backend for a student lab: stockable items,
direct issue/return of units, member borrow requests that turn into loans on
approval, and per-project stock allocations. Every stock movement commits
together with its paired record and an audit entry, or not at all.

## Identity

The service sits behind a gateway that authenticates callers and forwards
their identity as headers:

- `x-user-id`: caller's UUID (required on mutating routes)
- `x-user-name`: display name, snapshotted into the audit trail
- `x-user-role`: `member` (default) or `admin`

Requests without a valid `x-user-id` are rejected with 401 on routes that
need an identity. Role and ownership rules are enforced per operation.

## Error Handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "error": "Insufficient Stock",
  "message": "Item 4f0c... has 2 on hand, cannot remove 3",
  "request_id": "6f9a...",
  "timestamp": "2026-03-01T12:00:00Z"
}
```

## Pagination

List endpoints take `page` (default 1) and `limit` query parameters.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Items", description = "Inventory item management and stock movements"),
        (name = "Requests", description = "Member borrow requests"),
        (name = "Borrowings", description = "Equipment loans"),
        (name = "Allocations", description = "Project stock reservations"),
        (name = "Health", description = "Status and health endpoints")
    ),
    paths(
        // Items and stock movements
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::create_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,
        crate::handlers::items::issue_stock,
        crate::handlers::items::return_stock,

        // Borrow requests
        crate::handlers::requests::list_requests,
        crate::handlers::requests::get_request,
        crate::handlers::requests::submit_request,
        crate::handlers::requests::approve_request,
        crate::handlers::requests::reject_request,
        crate::handlers::requests::cancel_request,

        // Borrowings
        crate::handlers::borrowings::list_borrowings,
        crate::handlers::borrowings::get_borrowing,
        crate::handlers::borrowings::create_borrowing,
        crate::handlers::borrowings::close_borrowing,

        // Allocations
        crate::handlers::allocations::list_allocations,
        crate::handlers::allocations::get_allocation,
        crate::handlers::allocations::create_allocation,
        crate::handlers::allocations::delete_allocation,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ListQuery,

            // Item types
            crate::services::items::ItemResponse,
            crate::services::items::ItemListResponse,
            crate::services::items::CreateItemRequest,
            crate::services::items::UpdateItemRequest,
            crate::services::issuance::StockMovementRequest,
            crate::services::issuance::StockMovementResponse,

            // Request types
            crate::services::requests::BorrowRequestResponse,
            crate::services::requests::BorrowRequestListResponse,
            crate::services::requests::SubmitBorrowRequest,
            crate::services::requests::ResolutionRequest,
            crate::services::requests::ApprovalResponse,

            // Borrowing types
            crate::services::borrowings::BorrowingResponse,
            crate::services::borrowings::BorrowingListResponse,
            crate::services::borrowings::CreateBorrowingRequest,

            // Allocation types
            crate::services::allocations::AllocationResponse,
            crate::services::allocations::AllocationListResponse,
            crate::services::allocations::CreateAllocationRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_the_ledger_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Labstock API"));
        assert!(json.contains("/api/v1/items/{id}/issue"));
        assert!(json.contains("/api/v1/borrowings/{id}/close"));
        assert!(json.contains("/api/v1/requests/{id}/approve"));
    }
}
