//! Labstock API Library
//!
//! This crate provides the core functionality for the Labstock API: an
//! inventory stock ledger with issuance, borrow requests, borrowings, and
//! project allocations layered on top of it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl ListQuery {
    /// Clamps paging input against the configured bounds. Pages are 1-based;
    /// a missing or zero page becomes 1, a missing limit becomes the default
    /// page size, and an oversized limit is capped at the maximum.
    pub fn normalize(&self, cfg: &config::AppConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(u64::from(cfg.api_default_page_size))
            .clamp(1, u64::from(cfg.api_max_page_size));
        (page, limit)
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn list_query_normalization_clamps_to_config() {
        let cfg = crate::config::AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );

        let empty = ListQuery::default();
        assert_eq!(empty.normalize(&cfg), (1, u64::from(cfg.api_default_page_size)));

        let oversized = ListQuery {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(
            oversized.normalize(&cfg),
            (1, u64::from(cfg.api_max_page_size))
        );

        let plain = ListQuery {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(plain.normalize(&cfg), (3, 25));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// The versioned API surface. Identity comes from gateway headers via the
/// [`auth::Actor`] extractor on each mutating handler; role and ownership
/// rules live in the services, not here.
pub fn api_v1_routes() -> Router<AppState> {
    // Inventory items and the stock ledger operations on them
    let items = Router::new()
        .route(
            "/items",
            post(handlers::items::create_item).get(handlers::items::list_items),
        )
        .route(
            "/items/:id",
            get(handlers::items::get_item)
                .put(handlers::items::update_item)
                .delete(handlers::items::delete_item),
        )
        .route("/items/:id/issue", post(handlers::items::issue_stock))
        .route("/items/:id/return", post(handlers::items::return_stock));

    // Borrow request workflow
    let requests = Router::new()
        .route(
            "/requests",
            post(handlers::requests::submit_request).get(handlers::requests::list_requests),
        )
        .route("/requests/:id", get(handlers::requests::get_request))
        .route(
            "/requests/:id/approve",
            post(handlers::requests::approve_request),
        )
        .route(
            "/requests/:id/reject",
            post(handlers::requests::reject_request),
        )
        .route(
            "/requests/:id/cancel",
            post(handlers::requests::cancel_request),
        );

    // Borrowings (direct and approval-created)
    let borrowings = Router::new()
        .route(
            "/borrowings",
            post(handlers::borrowings::create_borrowing).get(handlers::borrowings::list_borrowings),
        )
        .route(
            "/borrowings/:id",
            get(handlers::borrowings::get_borrowing),
        )
        .route(
            "/borrowings/:id/close",
            post(handlers::borrowings::close_borrowing),
        );

    // Project allocations
    let allocations = Router::new()
        .route(
            "/allocations",
            post(handlers::allocations::create_allocation)
                .get(handlers::allocations::list_allocations),
        )
        .route(
            "/allocations/:id",
            get(handlers::allocations::get_allocation)
                .delete(handlers::allocations::delete_allocation),
        );

    Router::new()
        .merge(items)
        .merge(requests)
        .merge(borrowings)
        .merge(allocations)
}

/// Service status and health routes, mounted at the server root.
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "labstock-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    // Check database connectivity
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
