mod common;

use axum::http::{Method, StatusCode};
use common::{TestActor, TestApp};
use labstock_api::entities::history_entry;
use labstock_api::ledger::audit;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn item_crud_round_trip() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "name": "Bench PSU",
                "description": "0-30V adjustable",
                "location": "Shelf B2",
                "initial_quantity": 3,
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    let item_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["quantity"], 3);
    assert_eq!(body["data"]["location"], "Shelf B2");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/items/{}", item_id),
            Some(json!({ "location": "Cabinet 4" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    assert_eq!(body["data"]["location"], "Cabinet 4");
    // Untouched fields survive a partial update.
    assert_eq!(body["data"]["name"], "Bench PSU");
    assert_eq!(body["data"]["quantity"], 3);
    assert!(!body["data"]["updated_at"].is_null());

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_mutations_require_admin() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");
    let member = TestActor::member("sam");
    let item_id = app.seed_item(&admin, "Tap set", 2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": "Die set", "initial_quantity": 1 })),
            Some(&member),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/items/{}", item_id),
            Some(json!({ "name": "Renamed" })),
            Some(&member),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item_id),
            None,
            Some(&member),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Reads stay open to anyone.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item_id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn item_validation_rejects_bad_payloads() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": "", "initial_quantity": 1 })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "name": "Hammer", "initial_quantity": -1 })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_with_open_borrowings_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");
    let member = TestActor::member("sam");
    let item_id = app.seed_item(&admin, "Angle grinder", 3).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/borrowings",
            Some(json!({ "item_id": item_id, "quantity": 1 })),
            Some(&member),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    let borrowing_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // After the loan is closed the delete goes through.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/borrowings/{}/close", borrowing_id),
            None,
            Some(&member),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn item_with_live_allocations_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");
    let item_id = app.seed_item(&admin, "Relay module", 6).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/allocations",
            Some(json!({ "item_id": item_id, "project_id": Uuid::new_v4(), "quantity": 2 })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn listing_paginates_and_clamps() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");

    for name in ["Wrench", "Pliers", "Screwdriver"] {
        app.seed_item(&admin, name, 1).await;
    }

    let response = app
        .request(Method::GET, "/api/v1/items?page=1&limit=2", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["per_page"], 2);

    let response = app
        .request(Method::GET, "/api/v1/items?page=2&limit=2", None, None)
        .await;
    let body = TestApp::body_json(response).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    // Page zero and an oversized limit both get clamped, not rejected.
    let response = app
        .request(Method::GET, "/api/v1/items?page=0&limit=9999", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::body_json(response).await;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(
        body["data"]["per_page"],
        u64::from(app.state.config.api_max_page_size)
    );
}

#[tokio::test]
async fn item_lifecycle_is_audited() {
    let app = TestApp::new().await;
    let admin = TestActor::admin("vera");
    let item_id = app.seed_item(&admin, "Torx driver", 1).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/items/{}", item_id),
            Some(json!({ "description": "T5-T30" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    for action in [
        audit::ITEM_CREATED,
        audit::ITEM_UPDATED,
        audit::ITEM_DELETED,
    ] {
        let count = history_entry::Entity::find()
            .filter(history_entry::Column::Action.eq(action))
            .count(app.state.db.as_ref())
            .await
            .expect("count history entries");
        assert_eq!(count, 1, "expected exactly one '{}' entry", action);
    }
}
