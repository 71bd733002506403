//! Challenge API routes

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::services::ChallengeService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracer_shared::models::UserChallenge;
use tracer_shared::types::{ChallengeListResponse, EvaluateChallengesResponse, MyChallengesResponse};
use uuid::Uuid;

/// Create challenge routes
pub fn challenge_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_challenges))
        .route("/mine", get(my_challenges))
        .route("/evaluate", post(evaluate))
        .route("/:id/accept", post(accept))
}

/// GET /api/v1/challenges - Active challenges
async fn list_challenges(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<ChallengeListResponse>, ApiError> {
    let challenges = ChallengeService::list_active(state.store()).await?;
    Ok(Json(ChallengeListResponse { challenges }))
}

/// GET /api/v1/challenges/mine - Accepted challenges with progress
async fn my_challenges(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MyChallengesResponse>, ApiError> {
    let challenges = ChallengeService::mine(state.store(), auth.user_id).await?;
    Ok(Json(MyChallengesResponse { challenges }))
}

/// POST /api/v1/challenges/:id/accept
async fn accept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(challenge_id): Path<Uuid>,
) -> Result<(StatusCode, Json<UserChallenge>), ApiError> {
    let entry = ChallengeService::accept(state.store(), auth.user_id, challenge_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/v1/challenges/evaluate - Check accepted challenges against current stats
async fn evaluate(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<EvaluateChallengesResponse>, ApiError> {
    let response = ChallengeService::evaluate(state.store(), state.retry(), auth.user_id).await?;
    Ok(Json(response))
}
