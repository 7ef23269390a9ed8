use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Actor;
use crate::services::borrowings::{
    BorrowingListResponse, BorrowingResponse, CreateBorrowingRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct BorrowingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<Uuid>,
    /// true = only open loans, false = only returned ones
    pub open: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/v1/borrowings",
    summary = "Open borrowing",
    description = "Record a loan. With item_id, stock is decremented in the same unit of work; without it the loan is untracked. Admins may borrow on behalf of another member.",
    request_body = CreateBorrowingRequest,
    responses(
        (status = 200, description = "Borrowing opened", body = ApiResponse<BorrowingResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid identity headers", body = crate::errors::ErrorResponse),
        (status = 403, description = "Borrowing for another user requires admin", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateBorrowingRequest>,
) -> ApiResult<BorrowingResponse> {
    let opened = state.services.borrowings.borrow(&actor, payload).await?;
    Ok(Json(ApiResponse::success(opened)))
}

#[utoipa::path(
    get,
    path = "/api/v1/borrowings",
    summary = "List borrowings",
    description = "Members see their own loans; admins see all, optionally filtered by user or open state.",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page"),
        ("user_id" = Option<Uuid>, Query, description = "Filter by borrower (admin only)"),
        ("open" = Option<bool>, Query, description = "true for open loans, false for returned"),
    ),
    responses(
        (status = 200, description = "Borrowings retrieved", body = ApiResponse<BorrowingListResponse>),
        (status = 401, description = "Missing or invalid identity headers", body = crate::errors::ErrorResponse),
        (status = 403, description = "Filtering on another user requires admin", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<BorrowingListQuery>,
) -> ApiResult<BorrowingListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));

    let listed = state
        .services
        .borrowings
        .list_borrowings(&actor, page, limit, query.user_id, query.open)
        .await?;
    Ok(Json(ApiResponse::success(listed)))
}

#[utoipa::path(
    get,
    path = "/api/v1/borrowings/{id}",
    summary = "Get borrowing",
    params(("id" = Uuid, Path, description = "Borrowing id")),
    responses(
        (status = 200, description = "Borrowing retrieved", body = ApiResponse<BorrowingResponse>),
        (status = 403, description = "Not the borrower", body = crate::errors::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<BorrowingResponse> {
    let borrowing = state.services.borrowings.get_borrowing(&actor, id).await?;
    Ok(Json(ApiResponse::success(borrowing)))
}

#[utoipa::path(
    post,
    path = "/api/v1/borrowings/{id}/close",
    summary = "Close borrowing",
    description = "Mark a loan returned. Tracked loans restore their units in the same unit of work. Closing twice fails with 409.",
    params(("id" = Uuid, Path, description = "Borrowing id")),
    responses(
        (status = 200, description = "Borrowing closed", body = ApiResponse<BorrowingResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))),
        (status = 403, description = "Only the borrower or an admin may close", body = crate::errors::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Borrowing already returned", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn close_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<BorrowingResponse> {
    let closed = state.services.borrowings.close(&actor, id).await?;
    Ok(Json(ApiResponse::success(closed)))
}
