//! Live workout API routes
//!
//! Every handler returns the caller's workout snapshot after the command, so
//! clients can render straight from the response.

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracer_shared::types::{CompletionReport, StartRestRequest, StartWorkoutRequest};
use tracer_shared::workout::WorkoutSnapshot;
use uuid::Uuid;
use validator::Validate;

/// Create workout routes
pub fn workout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/start", post(start))
        .route("/start-today", post(start_today))
        .route("/pause", post(pause))
        .route("/resume", post(resume))
        .route("/toggle-pause", post(toggle_pause))
        .route("/next", post(next_exercise))
        .route("/previous", post(previous_exercise))
        .route("/rest", post(start_rest))
        .route("/exercises/:id/toggle", post(toggle_exercise))
        .route("/end", post(end))
        .route("/complete", post(complete))
}

type SnapshotResult = Result<Json<WorkoutSnapshot>, ApiError>;

/// GET /api/v1/workout - Current workout snapshot
async fn get_snapshot(State(state): State<AppState>, auth: AuthUser) -> Json<WorkoutSnapshot> {
    Json(state.workouts().snapshot(auth.user_id).await)
}

/// POST /api/v1/workout/start - Start a routine
async fn start(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<StartWorkoutRequest>,
) -> SnapshotResult {
    let snapshot = state.workouts().start(auth.user_id, req.routine_id).await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/workout/start-today - Start the routine planned for today
async fn start_today(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().start_today(auth.user_id).await?))
}

async fn pause(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().pause(auth.user_id).await?))
}

async fn resume(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().resume(auth.user_id).await?))
}

async fn toggle_pause(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().toggle_pause(auth.user_id).await?))
}

async fn next_exercise(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().next_exercise(auth.user_id).await?))
}

async fn previous_exercise(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().previous_exercise(auth.user_id).await?))
}

/// POST /api/v1/workout/rest - Start a rest countdown
///
/// Without a body, or without `seconds`, the current exercise's rest is used.
async fn start_rest(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<StartRestRequest>>,
) -> SnapshotResult {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;

    Ok(Json(state.workouts().start_rest(auth.user_id, req.seconds).await?))
}

/// POST /api/v1/workout/exercises/:id/toggle - Toggle an exercise's completion mark
async fn toggle_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(exercise_id): Path<Uuid>,
) -> SnapshotResult {
    Ok(Json(state.workouts().toggle_exercise(auth.user_id, exercise_id).await?))
}

/// POST /api/v1/workout/end - Abandon the workout without persisting
async fn end(State(state): State<AppState>, auth: AuthUser) -> SnapshotResult {
    Ok(Json(state.workouts().end(auth.user_id).await?))
}

/// POST /api/v1/workout/complete - Finish the workout and persist its results
async fn complete(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CompletionReport>, ApiError> {
    Ok(Json(state.workouts().complete(auth.user_id).await?))
}
