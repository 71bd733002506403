//! Profile progression API routes

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::ProfileService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracer_shared::models::ExperienceEntry;
use tracer_shared::types::{ExperienceQuery, ProgressSummary, VisibilityRequest};
use uuid::Uuid;
use validator::Validate;

/// Create profile routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/progress", get(get_progress))
        .route("/visibility", put(set_visibility))
        .route("/experience", get(get_experience))
        .route("/:id/progress", get(get_public_progress))
}

/// GET /api/v1/profile/progress - Caller's rank, stats and session totals
async fn get_progress(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProgressSummary>, ApiError> {
    Ok(Json(ProfileService::progress(state.store(), auth.user_id).await?))
}

/// PUT /api/v1/profile/visibility
async fn set_visibility(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<VisibilityRequest>,
) -> Result<Json<ProgressSummary>, ApiError> {
    let summary = ProfileService::set_visibility(state.store(), auth.user_id, req.is_public).await?;
    Ok(Json(summary))
}

/// GET /api/v1/profile/experience?limit=N - Most recent experience awards
async fn get_experience(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ExperienceQuery>,
) -> Result<Json<Vec<ExperienceEntry>>, ApiError> {
    query.validate()?;
    let entries =
        ProfileService::experience_history(state.store(), auth.user_id, query.limit).await?;
    Ok(Json(entries))
}

/// GET /api/v1/profile/:id/progress - Another user's summary, public profiles only
async fn get_public_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProgressSummary>, ApiError> {
    let summary = ProfileService::public_progress(state.store(), auth.user_id, user_id).await?;
    Ok(Json(summary))
}
