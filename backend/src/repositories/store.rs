//! Store contract
//!
//! Services depend on these traits rather than on a concrete database so the
//! workout engine and its reward steps can run against PostgreSQL in
//! production and against [`InMemoryStore`](super::InMemoryStore) in tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use tracer_shared::models::{
    AcceptedChallenge, Challenge, DayOfWeek, ExperienceEntry, NewExperienceEntry, PlanEntry,
    Profile, Routine, RoutineExercise, SessionCounts, SkillStats, UserChallenge, WorkoutSession,
};

use super::{
    ChallengeRepository, PlanRepository, ProfileRepository, RoutineRepository, SessionRepository,
};

/// Postgres error code for unique violations
const UNIQUE_VIOLATION: &str = "23505";

/// Store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Whether retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row".to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Routines, exercises and workout sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> StoreResult<()>;

    async fn routine(&self, id: Uuid) -> StoreResult<Option<Routine>>;

    /// Exercises of a routine ordered by `order_index`
    async fn routine_exercises(&self, routine_id: Uuid) -> StoreResult<Vec<RoutineExercise>>;

    /// Session row keyed by (user, routine, date), created when missing
    async fn find_or_create_session(
        &self,
        user_id: Uuid,
        routine_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<WorkoutSession>;

    async fn sessions_on(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkoutSession>>;

    /// Mark a session completed with its duration
    async fn complete_session(&self, id: Uuid, duration_minutes: i32) -> StoreResult<WorkoutSession>;

    async fn set_session_completed(&self, id: Uuid, completed: bool) -> StoreResult<WorkoutSession>;

    /// Sessions with `from <= date <= to`
    async fn sessions_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<WorkoutSession>>;

    async fn session_counts(&self, user_id: Uuid) -> StoreResult<SessionCounts>;
}

/// Profiles and experience history
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;

    async fn update_stats(&self, user_id: Uuid, stats: SkillStats) -> StoreResult<Profile>;

    /// Write experience. The cached level column is derived here and nowhere
    /// else.
    async fn update_experience(&self, user_id: Uuid, experience: i32) -> StoreResult<Profile>;

    async fn set_visibility(&self, user_id: Uuid, is_public: bool) -> StoreResult<Profile>;

    async fn insert_experience(&self, entry: NewExperienceEntry) -> StoreResult<ExperienceEntry>;

    /// Newest first
    async fn recent_experience(&self, user_id: Uuid, limit: i64)
        -> StoreResult<Vec<ExperienceEntry>>;
}

/// Weekly planner
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn weekly_plan(&self, user_id: Uuid) -> StoreResult<Vec<PlanEntry>>;

    async fn plan_for_day(&self, user_id: Uuid, day: DayOfWeek) -> StoreResult<Option<PlanEntry>>;

    /// Upsert keyed by (user, day)
    async fn assign_day(
        &self,
        user_id: Uuid,
        day: DayOfWeek,
        routine_id: Uuid,
    ) -> StoreResult<PlanEntry>;

    /// Returns whether a plan entry was removed
    async fn clear_day(&self, user_id: Uuid, day: DayOfWeek) -> StoreResult<bool>;
}

/// Challenges and their acceptance by users
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn active_challenges(&self) -> StoreResult<Vec<Challenge>>;

    async fn challenge(&self, id: Uuid) -> StoreResult<Option<Challenge>>;

    /// Fails with [`StoreError::Conflict`] when already accepted
    async fn accept_challenge(&self, user_id: Uuid, challenge_id: Uuid)
        -> StoreResult<UserChallenge>;

    async fn user_challenges(&self, user_id: Uuid) -> StoreResult<Vec<AcceptedChallenge>>;

    async fn update_challenge_progress(
        &self,
        id: Uuid,
        progress: i32,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<UserChallenge>;
}

/// Everything the services need from persistence
pub trait Store: SessionStore + ProfileStore + PlanStore + ChallengeStore {}

impl<T> Store for T where T: SessionStore + ProfileStore + PlanStore + ChallengeStore {}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::db::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn routine(&self, id: Uuid) -> StoreResult<Option<Routine>> {
        RoutineRepository::get_by_id(&self.pool, id).await
    }

    async fn routine_exercises(&self, routine_id: Uuid) -> StoreResult<Vec<RoutineExercise>> {
        RoutineRepository::get_exercises(&self.pool, routine_id).await
    }

    async fn find_or_create_session(
        &self,
        user_id: Uuid,
        routine_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<WorkoutSession> {
        SessionRepository::find_or_create(&self.pool, user_id, routine_id, date).await
    }

    async fn sessions_on(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkoutSession>> {
        SessionRepository::get_between(&self.pool, user_id, date, date).await
    }

    async fn complete_session(&self, id: Uuid, duration_minutes: i32) -> StoreResult<WorkoutSession> {
        SessionRepository::complete(&self.pool, id, duration_minutes).await
    }

    async fn set_session_completed(&self, id: Uuid, completed: bool) -> StoreResult<WorkoutSession> {
        SessionRepository::set_completed(&self.pool, id, completed).await
    }

    async fn sessions_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<WorkoutSession>> {
        SessionRepository::get_between(&self.pool, user_id, from, to).await
    }

    async fn session_counts(&self, user_id: Uuid) -> StoreResult<SessionCounts> {
        SessionRepository::counts(&self.pool, user_id).await
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        ProfileRepository::get_by_id(&self.pool, user_id).await
    }

    async fn update_stats(&self, user_id: Uuid, stats: SkillStats) -> StoreResult<Profile> {
        ProfileRepository::update_stats(&self.pool, user_id, stats).await
    }

    async fn update_experience(&self, user_id: Uuid, experience: i32) -> StoreResult<Profile> {
        ProfileRepository::update_experience(&self.pool, user_id, experience).await
    }

    async fn set_visibility(&self, user_id: Uuid, is_public: bool) -> StoreResult<Profile> {
        ProfileRepository::set_visibility(&self.pool, user_id, is_public).await
    }

    async fn insert_experience(&self, entry: NewExperienceEntry) -> StoreResult<ExperienceEntry> {
        ProfileRepository::insert_experience(&self.pool, entry).await
    }

    async fn recent_experience(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<ExperienceEntry>> {
        ProfileRepository::recent_experience(&self.pool, user_id, limit).await
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn weekly_plan(&self, user_id: Uuid) -> StoreResult<Vec<PlanEntry>> {
        PlanRepository::get_for_user(&self.pool, user_id).await
    }

    async fn plan_for_day(&self, user_id: Uuid, day: DayOfWeek) -> StoreResult<Option<PlanEntry>> {
        PlanRepository::get_for_day(&self.pool, user_id, day).await
    }

    async fn assign_day(
        &self,
        user_id: Uuid,
        day: DayOfWeek,
        routine_id: Uuid,
    ) -> StoreResult<PlanEntry> {
        PlanRepository::upsert(&self.pool, user_id, day, routine_id).await
    }

    async fn clear_day(&self, user_id: Uuid, day: DayOfWeek) -> StoreResult<bool> {
        PlanRepository::delete(&self.pool, user_id, day).await
    }
}

#[async_trait]
impl ChallengeStore for PgStore {
    async fn active_challenges(&self) -> StoreResult<Vec<Challenge>> {
        ChallengeRepository::get_active(&self.pool).await
    }

    async fn challenge(&self, id: Uuid) -> StoreResult<Option<Challenge>> {
        ChallengeRepository::get_by_id(&self.pool, id).await
    }

    async fn accept_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> StoreResult<UserChallenge> {
        ChallengeRepository::accept(&self.pool, user_id, challenge_id).await
    }

    async fn user_challenges(&self, user_id: Uuid) -> StoreResult<Vec<AcceptedChallenge>> {
        ChallengeRepository::get_for_user(&self.pool, user_id).await
    }

    async fn update_challenge_progress(
        &self,
        id: Uuid,
        progress: i32,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<UserChallenge> {
        ChallengeRepository::update_progress(&self.pool, id, progress, completed_at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_pool_errors_are_transient() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());
        assert!(StoreError::Unavailable("down".to_string()).is_transient());
        assert!(!StoreError::Conflict("dup".to_string()).is_transient());
    }
}
