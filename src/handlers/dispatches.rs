use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{DispatchRecord, NewDispatch, StatusBadge},
    services::{
        dispatch_reconciliation::DispatchView,
        reports::{self, DispatchSummary},
        spreadsheet_import::SpreadsheetRow,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default)]
pub struct DispatchListQuery {
    pub search: Option<String>,
}

/// Record plus its presentation badge.
#[derive(Debug, Serialize)]
pub struct DispatchItem {
    #[serde(flatten)]
    pub record: DispatchRecord,
    pub badge: StatusBadge,
}

impl From<DispatchRecord> for DispatchItem {
    fn from(record: DispatchRecord) -> Self {
        let badge = StatusBadge::for_status(&record.status);
        Self { record, badge }
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchListResponse {
    pub items: Vec<DispatchItem>,
    pub count: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

impl From<DispatchView> for DispatchListResponse {
    fn from(view: DispatchView) -> Self {
        Self {
            count: view.records.len(),
            total: view.total,
            fetch_error: view.fetch_error,
            items: view.records.into_iter().map(DispatchItem::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn list_dispatches(
    State(state): State<AppState>,
    Query(query): Query<DispatchListQuery>,
) -> ApiResult<DispatchListResponse> {
    let view = state
        .services
        .dispatches
        .view(query.search.as_deref())
        .await;
    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn refresh_dispatches(State(state): State<AppState>) -> ApiResult<DispatchListResponse> {
    let view = state.services.dispatches.refresh().await;
    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn import_spreadsheet(
    State(state): State<AppState>,
    Json(rows): Json<Vec<SpreadsheetRow>>,
) -> ApiResult<DispatchListResponse> {
    let view = state.services.dispatches.import_spreadsheet(&rows).await;
    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn clear_spreadsheet(State(state): State<AppState>) -> ApiResult<DispatchListResponse> {
    let view = state.services.dispatches.clear_spreadsheet().await;
    Ok(Json(ApiResponse::success(view.into())))
}

pub async fn create_dispatch(
    State(state): State<AppState>,
    Json(payload): Json<NewDispatch>,
) -> Result<(StatusCode, Json<ApiResponse<DispatchItem>>), ServiceError> {
    let created = state.services.dispatches.create_dispatch(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

pub async fn update_dispatch_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<DispatchItem> {
    let updated = state
        .services
        .dispatches
        .update_status(id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(updated.into())))
}

pub async fn export_dispatches(
    State(state): State<AppState>,
    Query(query): Query<DispatchListQuery>,
) -> Response {
    let view = state
        .services
        .dispatches
        .view(query.search.as_deref())
        .await;
    let body = reports::export_csv(&view.records);

    (
        [
            (header::CONTENT_TYPE, reports::CSV_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"despachos.csv\"",
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn dispatch_summary(
    State(state): State<AppState>,
    Query(query): Query<DispatchListQuery>,
) -> ApiResult<DispatchSummary> {
    let view = state
        .services
        .dispatches
        .view(query.search.as_deref())
        .await;
    Ok(Json(ApiResponse::success(reports::summarize_by_status(
        &view.records,
    ))))
}
