use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::entities::borrow_request::RequestStatus;
use crate::services::requests::{
    ApprovalResponse, BorrowRequestListResponse, BorrowRequestResponse, ResolutionRequest,
    SubmitBorrowRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<RequestStatus>,
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/requests",
    summary = "Submit borrow request",
    description = "File a request to borrow a tool. Any member may submit; the request starts pending.",
    request_body = SubmitBorrowRequest,
    responses(
        (status = 200, description = "Request submitted", body = ApiResponse<BorrowRequestResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid identity headers", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn submit_request(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<SubmitBorrowRequest>,
) -> ApiResult<BorrowRequestResponse> {
    let submitted = state.services.requests.submit(&actor, payload).await?;
    Ok(Json(ApiResponse::success(submitted)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests",
    summary = "List borrow requests",
    description = "Members see their own requests; admins see all, optionally filtered by status or user.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status (pending, approved, rejected, cancelled)"),
        ("user_id" = Option<Uuid>, Query, description = "Filter by owner (admin only)"),
    ),
    responses(
        (status = 200, description = "Requests retrieved", body = ApiResponse<BorrowRequestListResponse>),
        (status = 401, description = "Missing or invalid identity headers", body = crate::errors::ErrorResponse),
        (status = 403, description = "Filtering on another user requires admin", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<BorrowRequestListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));

    let listed = state
        .services
        .requests
        .list_requests(&actor, page, limit, query.status, query.user_id)
        .await?;
    Ok(Json(ApiResponse::success(listed)))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    summary = "Get borrow request",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request retrieved", body = ApiResponse<BorrowRequestResponse>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<BorrowRequestResponse> {
    let request = state.services.requests.get_request(&actor, id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/approve",
    summary = "Approve borrow request",
    description = "Approve a pending request and open the matching borrowing in the same unit of work. Admin only.",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request approved", body = ApiResponse<ApprovalResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request already resolved", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn approve_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<ApprovalResponse> {
    let approval = state.services.requests.approve(&actor, id).await?;
    Ok(Json(ApiResponse::success(approval)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/reject",
    summary = "Reject borrow request",
    description = "Reject a pending request with an optional reason. Admin only.",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = ResolutionRequest,
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<BorrowRequestResponse>),
        (status = 403, description = "Administrator role required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request already resolved", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Option<Json<ResolutionRequest>>,
) -> ApiResult<BorrowRequestResponse> {
    let resolution = payload.map(|Json(r)| r).unwrap_or_default();
    let rejected = state
        .services
        .requests
        .reject(&actor, id, resolution)
        .await?;
    Ok(Json(ApiResponse::success(rejected)))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/cancel",
    summary = "Cancel borrow request",
    description = "Cancel a pending request. Owner or admin.",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = ResolutionRequest,
    responses(
        (status = 200, description = "Request cancelled", body = ApiResponse<BorrowRequestResponse>),
        (status = 403, description = "Only the owner or an admin may cancel", body = crate::errors::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request already resolved", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Option<Json<ResolutionRequest>>,
) -> ApiResult<BorrowRequestResponse> {
    let resolution = payload.map(|Json(r)| r).unwrap_or_default();
    let cancelled = state
        .services
        .requests
        .cancel(&actor, id, resolution)
        .await?;
    Ok(Json(ApiResponse::success(cancelled)))
}
