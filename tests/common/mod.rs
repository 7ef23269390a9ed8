use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware, Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use labstock_api::{
    auth::{USER_ID_HEADER, USER_NAME_HEADER, USER_ROLE_HEADER},
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

/// A caller identity as the authenticating gateway would assert it.
#[derive(Clone)]
pub struct TestActor {
    pub user_id: Uuid,
    pub username: String,
    pub role: &'static str,
}

impl TestActor {
    pub fn admin(name: &str) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            role: "admin",
        }
    }

    pub fn member(name: &str) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            role: "member",
        }
    }
}

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // One connection only: each in-memory SQLite connection is its own
        // database, so migrations and requests must share the connection.
        let db_cfg = DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let cfg = AppConfig::new(
            db_cfg.url.clone(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Some(event_sender));

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let router = Router::new()
            .merge(labstock_api::status_routes())
            .nest("/api/v1", labstock_api::api_v1_routes())
            .merge(labstock_api::openapi::swagger_ui())
            .layer(middleware::from_fn(
                labstock_api::tracing::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a request against the router, optionally acting as someone.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        actor: Option<&TestActor>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(actor) = actor {
            builder = builder
                .header(USER_ID_HEADER, actor.user_id.to_string())
                .header(USER_NAME_HEADER, actor.username.as_str())
                .header(USER_ROLE_HEADER, actor.role);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with explicit raw headers instead of a [`TestActor`].
    #[allow(dead_code)]
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Decode a response body as JSON.
    pub async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        serde_json::from_slice(&bytes).expect("response body was not valid JSON")
    }

    /// Create an item through the API and return its id.
    #[allow(dead_code)]
    pub async fn seed_item(&self, admin: &TestActor, name: &str, quantity: i32) -> Uuid {
        let response = self
            .request(
                Method::POST,
                "/api/v1/items",
                Some(json!({ "name": name, "initial_quantity": quantity })),
                Some(admin),
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "seeding item '{}' failed",
            name
        );

        let body = Self::body_json(response).await;
        body["data"]["id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .expect("created item response carried no id")
    }

    /// Fetch an item through the API and return its current quantity.
    #[allow(dead_code)]
    pub async fn item_quantity(&self, item_id: Uuid) -> i64 {
        let response = self
            .request(
                Method::GET,
                &format!("/api/v1/items/{}", item_id),
                None,
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = Self::body_json(response).await;
        body["data"]["quantity"]
            .as_i64()
            .expect("item response carried no quantity")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
