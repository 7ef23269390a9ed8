mod common;

use axum::http::{Method, StatusCode};
use common::{TestActor, TestApp};
use labstock_api::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn mutations_without_identity_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": "Unclaimed", "initial_quantity": 1 })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/requests",
            Some(json!({ "title": "Need", "tool": "Drill", "quantity": 1 })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/borrowings",
            Some(json!({ "quantity": 1, "tool": "Ladder" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_identity_headers_are_unauthorized() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");
    let item_id = app.seed_item(&admin, "Test bench", 1).await;
    let issue_uri = format!("/api/v1/items/{}/issue", item_id);
    let payload = json!({ "user_id": Uuid::new_v4(), "quantity": 1 });

    // Not a UUID
    let response = app
        .request_with_headers(
            Method::POST,
            &issue_uri,
            Some(payload.clone()),
            &[(USER_ID_HEADER, "not-a-uuid")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown role value
    let stray_id = Uuid::new_v4().to_string();
    let response = app
        .request_with_headers(
            Method::POST,
            &issue_uri,
            Some(payload),
            &[(USER_ID_HEADER, stray_id.as_str()), (USER_ROLE_HEADER, "superuser")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was issued while identities were being rejected.
    assert_eq!(app.item_quantity(item_id).await, 1);
}

#[tokio::test]
async fn missing_role_header_means_member() {
    let app = TestApp::new().await;
    let stray_id = Uuid::new_v4().to_string();

    // Without an asserted role the caller gets least privilege, so an
    // admin-only route refuses rather than rejects the identity.
    let response = app
        .request_with_headers(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": "Sneaky", "initial_quantity": 1 })),
            &[(USER_ID_HEADER, stray_id.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn status_and_docs_are_open() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    assert_eq!(body["data"]["service"], "labstock-api");
    assert_eq!(body["data"]["status"], "ok");

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    assert_eq!(body["info"]["title"], "Labstock API");
    assert!(body["paths"]["/api/v1/items/{id}/issue"].is_object());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/items", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = TestApp::body_json(response).await;
    assert!(body["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn error_bodies_follow_the_standard_envelope() {
    let app = TestApp::new().await;
    let member = TestActor::member("sam");

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": "Nope", "initial_quantity": 1 })),
            Some(&member),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = TestApp::body_json(response).await;
    assert_eq!(body["error"], "Forbidden");
    assert!(body["message"].as_str().unwrap().contains("Administrator"));
    assert!(body["request_id"].is_string());
    assert!(body["timestamp"].is_string());
}
