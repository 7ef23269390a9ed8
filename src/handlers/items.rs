use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::auth::Actor;
use crate::services::issuance::{StockMovementRequest, StockMovementResponse};
use crate::services::items::{
    CreateItemRequest, ItemListResponse, ItemResponse, UpdateItemRequest,
};
use crate::{ApiResponse, ApiResult, AppState, ListQuery};

#[utoipa::path(
    post,
    path = "/api/v1/items",
    summary = "Create item",
    description = "Create an inventory item with its opening stock. Admin only.",
    request_body = CreateItemRequest,
    responses(
        (status = 200, description = "Item created", body = ApiResponse<ItemResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid identity headers", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateItemRequest>,
) -> ApiResult<ItemResponse> {
    let created = state.services.items.create_item(&actor, payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    summary = "List items",
    description = "Get a paginated list of inventory items",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<ItemListResponse>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ItemListResponse> {
    let (page, limit) = query.normalize(&state.config);
    let listed = state.services.items.list_items(page, limit).await?;
    Ok(Json(ApiResponse::success(listed)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    summary = "Get item",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item retrieved", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ItemResponse> {
    let item = state.services.items.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    summary = "Update item",
    description = "Update an item's name, description or location. Stock is out of reach here; use issue/return.",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult<ItemResponse> {
    let updated = state.services.items.update_item(&actor, id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    summary = "Delete item",
    description = "Delete an item. Refused while allocations or open tracked borrowings reference it.",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item still referenced", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.items.delete_item(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/issue",
    summary = "Issue stock",
    description = "Issue units of an item to a member. Fails with 422 when fewer units are on hand.",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = StockMovementRequest,
    responses(
        (status = 200, description = "Stock issued", body = ApiResponse<StockMovementResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn issue_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockMovementRequest>,
) -> ApiResult<StockMovementResponse> {
    let movement = state.services.issuance.issue(&actor, id, payload).await?;
    Ok(Json(ApiResponse::success(movement)))
}

#[utoipa::path(
    post,
    path = "/api/v1/items/{id}/return",
    summary = "Return stock",
    description = "Return previously issued units to the shelf.",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = StockMovementRequest,
    responses(
        (status = 200, description = "Stock returned", body = ApiResponse<StockMovementResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn return_stock(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockMovementRequest>,
) -> ApiResult<StockMovementResponse> {
    let movement = state
        .services
        .issuance
        .return_stock(&actor, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(movement)))
}
