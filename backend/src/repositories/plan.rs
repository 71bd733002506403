//! Weekly plan repository

use sqlx::PgPool;
use uuid::Uuid;

use tracer_shared::models::{DayOfWeek, PlanEntry};

use super::store::{StoreError, StoreResult};

/// Weekly plan record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRecord {
    pub user_id: Uuid,
    pub day_of_week: String,
    pub routine_id: Uuid,
}

impl TryFrom<PlanRecord> for PlanEntry {
    type Error = StoreError;

    fn try_from(r: PlanRecord) -> Result<Self, Self::Error> {
        Ok(PlanEntry {
            user_id: r.user_id,
            day: r.day_of_week.parse().map_err(StoreError::InvalidData)?,
            routine_id: r.routine_id,
        })
    }
}

/// Weekly plan repository
pub struct PlanRepository;

impl PlanRepository {
    pub async fn get_for_user(pool: &PgPool, user_id: Uuid) -> StoreResult<Vec<PlanEntry>> {
        let records = sqlx::query_as::<_, PlanRecord>(
            r#"
            SELECT user_id, day_of_week, routine_id
            FROM weekly_plans
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut entries = records
            .into_iter()
            .map(PlanEntry::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        entries.sort_by_key(|e| e.day);
        Ok(entries)
    }

    pub async fn get_for_day(
        pool: &PgPool,
        user_id: Uuid,
        day: DayOfWeek,
    ) -> StoreResult<Option<PlanEntry>> {
        let record = sqlx::query_as::<_, PlanRecord>(
            r#"
            SELECT user_id, day_of_week, routine_id
            FROM weekly_plans
            WHERE user_id = $1 AND day_of_week = $2
            "#,
        )
        .bind(user_id)
        .bind(day.as_str())
        .fetch_optional(pool)
        .await?;

        record.map(PlanEntry::try_from).transpose()
    }

    /// Assign a routine to a day, replacing any previous assignment
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        day: DayOfWeek,
        routine_id: Uuid,
    ) -> StoreResult<PlanEntry> {
        let record = sqlx::query_as::<_, PlanRecord>(
            r#"
            INSERT INTO weekly_plans (user_id, day_of_week, routine_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, day_of_week)
            DO UPDATE SET routine_id = EXCLUDED.routine_id
            RETURNING user_id, day_of_week, routine_id
            "#,
        )
        .bind(user_id)
        .bind(day.as_str())
        .bind(routine_id)
        .fetch_one(pool)
        .await?;

        record.try_into()
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, day: DayOfWeek) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM weekly_plans WHERE user_id = $1 AND day_of_week = $2")
            .bind(user_id)
            .bind(day.as_str())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
