//! Weekly planner API routes

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::PlannerService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use tracer_shared::models::DayOfWeek;
use tracer_shared::types::{
    AssignRoutineRequest, DayStatusRequest, DayStatusResponse, PlannerResponse,
    TodayRoutineResponse,
};

/// Create planner routes
pub fn planner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_week))
        .route("/today", get(get_today))
        .route("/:day", put(assign_day))
        .route("/:day/status", put(set_day_status))
}

/// GET /api/v1/planner - Plan and statuses for the current week
async fn get_week(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PlannerResponse>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(PlannerService::week(state.store(), auth.user_id, today).await?))
}

/// GET /api/v1/planner/today - Routine planned for today
async fn get_today(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TodayRoutineResponse>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(PlannerService::today(state.store(), auth.user_id, today).await?))
}

/// PUT /api/v1/planner/:day - Assign a routine, or clear the day with `null`
async fn assign_day(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(day): Path<DayOfWeek>,
    Json(req): Json<AssignRoutineRequest>,
) -> Result<Response, ApiError> {
    let entry = PlannerService::assign(state.store(), auth.user_id, day, req.routine_id).await?;
    Ok(match entry {
        Some(entry) => Json(entry).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// PUT /api/v1/planner/:day/status - Mark a day completed or incomplete
async fn set_day_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(day): Path<DayOfWeek>,
    Json(req): Json<DayStatusRequest>,
) -> Result<Json<DayStatusResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let response = PlannerService::set_day_status(
        state.store(),
        state.retry(),
        auth.user_id,
        day,
        req.status,
        today,
    )
    .await?;
    Ok(Json(response))
}
