use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::services::allocations::{
    AllocationListResponse, AllocationResponse, CreateAllocationRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AllocationListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub item_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/allocations",
    summary = "Allocate stock to a project",
    description = "Park units of an item for a project. Stock is decremented in the same unit of work. Admin only.",
    request_body = CreateAllocationRequest,
    responses(
        (status = 200, description = "Stock allocated", body = ApiResponse<AllocationResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_allocation(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateAllocationRequest>,
) -> ApiResult<AllocationResponse> {
    let allocated = state.services.allocations.allocate(&actor, payload).await?;
    Ok(Json(ApiResponse::success(allocated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/allocations",
    summary = "List allocations",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("item_id" = Option<Uuid>, Query, description = "Filter by item"),
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
    ),
    responses(
        (status = 200, description = "Allocations retrieved", body = ApiResponse<AllocationListResponse>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_allocations(
    State(state): State<AppState>,
    Query(query): Query<AllocationListQuery>,
) -> ApiResult<AllocationListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));

    let listed = state
        .services
        .allocations
        .list_allocations(page, limit, query.item_id, query.project_id)
        .await?;
    Ok(Json(ApiResponse::success(listed)))
}

#[utoipa::path(
    get,
    path = "/api/v1/allocations/{id}",
    summary = "Get allocation",
    params(("id" = Uuid, Path, description = "Allocation id")),
    responses(
        (status = 200, description = "Allocation retrieved", body = ApiResponse<AllocationResponse>),
        (status = 404, description = "Allocation not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AllocationResponse> {
    let allocation = state.services.allocations.get_allocation(id).await?;
    Ok(Json(ApiResponse::success(allocation)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/allocations/{id}",
    summary = "Revoke allocation",
    description = "Delete an allocation and restore its units to the item. The restore is additive on the current quantity. Admin only.",
    params(("id" = Uuid, Path, description = "Allocation id")),
    responses(
        (status = 200, description = "Allocation revoked", body = ApiResponse<serde_json::Value>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Allocation not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn delete_allocation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.allocations.deallocate(&actor, id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "revoked": id }),
    )))
}
