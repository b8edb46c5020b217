use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use stockroom_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Helper harness for spinning up the full router backed by an in-memory
/// SQLite database. The pool is capped at a single connection so every
/// statement sees the same database, and separate instances are fully
/// isolated from each other.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender));

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            services,
        };

        // Mirror the layers main() applies, minus CORS and compression which
        // have no bearing on these tests.
        let router = Router::new()
            .route("/", get(|| async { "stockroom-api up" }))
            .route(
                "/metrics",
                get(|| async move {
                    match stockroom_api::metrics::gather_metrics() {
                        Ok(text) => (StatusCode::OK, text),
                        Err(_) => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            String::from("metrics error"),
                        ),
                    }
                }),
            )
            .nest("/api/v1", stockroom_api::api_v1_routes())
            .layer(axum::middleware::from_fn(
                stockroom_api::middleware_helpers::request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

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

    /// Same as [`TestApp::request`] with extra headers attached.
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

    /// Seed a purchase order through the public API and return its id.
    #[allow(dead_code)]
    pub async fn seed_purchase_order(&self, unique_id: &str, items: Value) -> i64 {
        let response = self
            .request(
                Method::POST,
                "/api/v1/purchase-orders",
                Some(json!({ "unique_id": unique_id, "items": items })),
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "failed to seed purchase order {unique_id}"
        );

        let created = response_json(response).await;
        created["data"]["id"].as_i64().expect("created order id")
    }

    /// Seed an order and walk it to pending_receive via approval.
    #[allow(dead_code)]
    pub async fn seed_approved_purchase_order(&self, unique_id: &str, items: Value) -> i64 {
        let id = self.seed_purchase_order(unique_id, items).await;
        let response = self
            .request(
                Method::POST,
                &format!("/api/v1/purchase-orders/{id}/approve"),
                None,
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "failed to approve seeded purchase order {unique_id}"
        );
        id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Decode a response body into JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
