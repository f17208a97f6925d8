//! Avitrans API Library
//!
//! Dispatch reconciliation and growth-curve selection for a poultry
//! transport operator, served over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
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
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let dispatches = Router::new()
        .route(
            "/",
            get(handlers::dispatches::list_dispatches).post(handlers::dispatches::create_dispatch),
        )
        .route("/refresh", post(handlers::dispatches::refresh_dispatches))
        .route(
            "/import",
            post(handlers::dispatches::import_spreadsheet)
                .delete(handlers::dispatches::clear_spreadsheet),
        )
        .route("/export", get(handlers::dispatches::export_dispatches))
        .route("/summary", get(handlers::dispatches::dispatch_summary))
        .route(
            "/:id/status",
            put(handlers::dispatches::update_dispatch_status),
        );

    let growth_profiles = Router::new()
        .route(
            "/",
            get(handlers::growth_profiles::list_profiles)
                .post(handlers::growth_profiles::create_profile),
        )
        .route("/filter", get(handlers::growth_profiles::filter_profiles))
        .route(
            "/selection",
            get(handlers::growth_profiles::get_selection)
                .put(handlers::growth_profiles::update_selection),
        )
        .route(
            "/:id",
            put(handlers::growth_profiles::update_profile)
                .delete(handlers::growth_profiles::delete_profile),
        )
        .route(
            "/:id/consumption",
            get(handlers::growth_profiles::profile_consumption),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/dispatches", dispatches)
        .nest("/growth-profiles", growth_profiles)
}

/// Full application router: v1 API, request ids, HTTP tracing and timeouts.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "avitrans-api up" }))
        .nest("/api/v1", api_v1_routes())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
