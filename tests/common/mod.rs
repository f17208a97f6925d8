#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use avitrans_api::{
    build_router,
    config::AppConfig,
    db,
    handlers::AppServices,
    repositories::{DispatchRepository, DispatchStore},
    AppState,
};

/// Application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = Self::state(None).await;
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// Same as [`TestApp::new`] but dispatches are read from `store`.
    pub async fn with_store(store: Arc<dyn DispatchStore>) -> Self {
        let state = Self::state(Some(store)).await;
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    async fn state(store: Option<Arc<dyn DispatchStore>>) -> AppState {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::ensure_schema(&pool)
            .await
            .expect("failed to create dispatch schema");
        let db_arc = Arc::new(pool);

        let store = store.unwrap_or_else(|| Arc::new(DispatchRepository::new(db_arc.clone())));
        let services = AppServices::new(store, &cfg.spreadsheet_id_prefix);

        AppState {
            db: db_arc,
            services,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
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

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body is not utf-8")
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("response body is not json")
}
