//! API request and response types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AcceptedChallenge, Challenge, DayOfWeek, ExperienceEntry, Routine, RoutineExercise, SkillStats,
    StatKind, WorkoutSession,
};
use crate::planner::DayOverview;
use crate::progression::Rank;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ============================================================================
// Workout Types
// ============================================================================

/// Start a workout for a routine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWorkoutRequest {
    pub routine_id: Uuid,
}

/// Begin a rest countdown. Without `seconds` the current exercise's rest is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StartRestRequest {
    #[validate(range(max = 3600, message = "Rest cannot exceed 3600 seconds"))]
    #[serde(default)]
    pub seconds: Option<i32>,
}

/// Outcome of finishing a workout.
///
/// `degraded` names the reward steps that failed after the session itself was
/// saved ("stats").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionReport {
    pub session: WorkoutSession,
    pub completed_exercises: usize,
    pub total_exercises: usize,
    pub stat_increase: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SkillStats>,
    pub degraded: Vec<String>,
}

impl CompletionReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

// ============================================================================
// Planner Types
// ============================================================================

/// Assign a routine to a weekday; `null` clears the day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRoutineRequest {
    pub routine_id: Option<Uuid>,
}

/// Status a user may set by hand on a day of the current week
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ManualStatus {
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayStatusRequest {
    pub status: ManualStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayStatusResponse {
    pub day: DayOfWeek,
    pub date: NaiveDate,
    pub session: WorkoutSession,
    pub experience_awarded: i32,
}

/// Weekly planner view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerResponse {
    pub week_start: NaiveDate,
    pub today: DayOfWeek,
    pub days: Vec<DayOverview>,
}

/// Routine planned for today, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayRoutineResponse {
    pub day: DayOfWeek,
    pub date: NaiveDate,
    pub routine: Option<Routine>,
    pub exercises: Vec<RoutineExercise>,
}

// ============================================================================
// Challenge Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeListResponse {
    pub challenges: Vec<Challenge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyChallengesResponse {
    pub challenges: Vec<AcceptedChallenge>,
}

/// Result of checking one accepted challenge against current stats
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeEvaluation {
    pub user_challenge_id: Uuid,
    pub challenge_id: Uuid,
    pub title: String,
    pub progress: i32,
    pub target_value: i32,
    pub completed: bool,
    pub experience_awarded: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateChallengesResponse {
    pub evaluations: Vec<ChallengeEvaluation>,
    pub experience_awarded: i32,
}

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRequest {
    pub is_public: bool,
}

/// Experience history query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExperienceQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    #[serde(default)]
    pub limit: Option<i64>,
}

/// A single stat with its letter grade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatView {
    pub stat: StatKind,
    pub value: i32,
    pub rank: Rank,
}

/// Progress summary shown on the profile screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub is_public: bool,
    pub level: Rank,
    pub experience: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_rank: Option<Rank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_to_next_rank: Option<i32>,
    pub stats: Vec<StatView>,
    pub average_stat: i32,
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub completion_rate: i64,
    pub recent_experience: Vec<ExperienceEntry>,
}
