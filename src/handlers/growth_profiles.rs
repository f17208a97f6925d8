use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{BirdSex, Breed, GrowthProfile, GrowthProfileInput},
    services::growth_profiles::{FeedRequirement, SelectionUpdate, SelectionView},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct ProfileFilterQuery {
    pub breed: Breed,
    pub sex: BirdSex,
}

#[derive(Debug, Deserialize)]
pub struct ConsumptionQuery {
    pub placement_date: NaiveDate,
    /// Defaults to today (UTC).
    pub on: Option<NaiveDate>,
    #[serde(default = "default_birds")]
    pub birds: u32,
}

fn default_birds() -> u32 {
    1
}

pub async fn list_profiles(State(state): State<AppState>) -> ApiResult<Vec<GrowthProfile>> {
    Ok(Json(ApiResponse::success(
        state.services.growth_profiles.list().await,
    )))
}

pub async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<GrowthProfileInput>,
) -> Result<(StatusCode, Json<ApiResponse<GrowthProfile>>), ServiceError> {
    let profile = state.services.growth_profiles.create(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(profile))))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrowthProfileInput>,
) -> ApiResult<GrowthProfile> {
    let profile = state.services.growth_profiles.update(id, payload).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.growth_profiles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn filter_profiles(
    State(state): State<AppState>,
    Query(query): Query<ProfileFilterQuery>,
) -> ApiResult<Vec<GrowthProfile>> {
    let profiles = state
        .services
        .growth_profiles
        .filter(query.breed, query.sex)
        .await;
    Ok(Json(ApiResponse::success(profiles)))
}

pub async fn get_selection(State(state): State<AppState>) -> ApiResult<SelectionView> {
    Ok(Json(ApiResponse::success(
        state.services.growth_profiles.selection().await,
    )))
}

pub async fn update_selection(
    State(state): State<AppState>,
    Json(payload): Json<SelectionUpdate>,
) -> ApiResult<SelectionView> {
    let view = state
        .services
        .growth_profiles
        .update_selection(payload)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn profile_consumption(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ConsumptionQuery>,
) -> ApiResult<FeedRequirement> {
    let on = query.on.unwrap_or_else(|| Utc::now().date_naive());
    let requirement = state
        .services
        .growth_profiles
        .consumption(id, query.placement_date, on, query.birds)
        .await?;
    Ok(Json(ApiResponse::success(requirement)))
}
