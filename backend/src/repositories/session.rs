//! Workout session repository

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use tracer_shared::models::{SessionCounts, WorkoutSession};

use super::store::{StoreError, StoreResult};

/// Workout session record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub routine_id: Uuid,
    pub date: NaiveDate,
    pub completed: bool,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

impl From<SessionRecord> for WorkoutSession {
    fn from(r: SessionRecord) -> Self {
        WorkoutSession {
            id: r.id,
            user_id: r.user_id,
            routine_id: r.routine_id,
            date: r.date,
            completed: r.completed,
            duration_minutes: r.duration_minutes,
            notes: r.notes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRecord {
    total: i64,
    completed: i64,
}

/// Workout session repository
pub struct SessionRepository;

impl SessionRepository {
    /// Return the session for (user, routine, date), inserting it when absent
    pub async fn find_or_create(
        pool: &PgPool,
        user_id: Uuid,
        routine_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<WorkoutSession> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO workout_sessions (user_id, routine_id, date)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, routine_id, date)
            DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, routine_id, date, completed, duration_minutes, notes
            "#,
        )
        .bind(user_id)
        .bind(routine_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

        Ok(record.into())
    }

    /// Mark completed and record the rounded duration
    pub async fn complete(
        pool: &PgPool,
        id: Uuid,
        duration_minutes: i32,
    ) -> StoreResult<WorkoutSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            UPDATE workout_sessions
            SET completed = TRUE, duration_minutes = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, routine_id, date, completed, duration_minutes, notes
            "#,
        )
        .bind(id)
        .bind(duration_minutes)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Session {}", id)))?;

        Ok(record.into())
    }

    /// Set only the completed flag
    pub async fn set_completed(
        pool: &PgPool,
        id: Uuid,
        completed: bool,
    ) -> StoreResult<WorkoutSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            UPDATE workout_sessions
            SET completed = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, routine_id, date, completed, duration_minutes, notes
            "#,
        )
        .bind(id)
        .bind(completed)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Session {}", id)))?;

        Ok(record.into())
    }

    /// Sessions in an inclusive date range
    pub async fn get_between(
        pool: &PgPool,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<WorkoutSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, user_id, routine_id, date, completed, duration_minutes, notes
            FROM workout_sessions
            WHERE user_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date, created_at
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Total and completed session counts
    pub async fn counts(pool: &PgPool, user_id: Uuid) -> StoreResult<SessionCounts> {
        let record = sqlx::query_as::<_, CountsRecord>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE completed) AS completed
            FROM workout_sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(SessionCounts {
            total: record.total,
            completed: record.completed,
        })
    }
}
