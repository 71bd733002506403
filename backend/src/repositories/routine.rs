//! Routine and routine exercise repository

use sqlx::PgPool;
use uuid::Uuid;

use tracer_shared::models::{Routine, RoutineExercise};

use super::store::{StoreError, StoreResult};

/// Routine record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoutineRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub duration_minutes: i32,
    pub is_public: bool,
    pub is_default: bool,
    pub creator_id: Option<Uuid>,
}

impl TryFrom<RoutineRecord> for Routine {
    type Error = StoreError;

    fn try_from(r: RoutineRecord) -> Result<Self, Self::Error> {
        Ok(Routine {
            id: r.id,
            title: r.title,
            description: r.description,
            difficulty: r.difficulty.parse().map_err(StoreError::InvalidData)?,
            duration_minutes: r.duration_minutes,
            is_public: r.is_public,
            is_default: r.is_default,
            creator_id: r.creator_id,
        })
    }
}

/// Exercise record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExerciseRecord {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sets: i32,
    pub reps: String,
    pub rest_seconds: i32,
    pub order_index: i32,
}

impl From<ExerciseRecord> for RoutineExercise {
    fn from(r: ExerciseRecord) -> Self {
        RoutineExercise {
            id: r.id,
            routine_id: r.routine_id,
            name: r.name,
            description: r.description,
            sets: r.sets,
            reps: r.reps,
            rest_seconds: r.rest_seconds,
            order_index: r.order_index,
        }
    }
}

/// Routine repository
pub struct RoutineRepository;

impl RoutineRepository {
    /// Get routine by ID
    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<Routine>> {
        let record = sqlx::query_as::<_, RoutineRecord>(
            r#"
            SELECT id, title, description, difficulty, duration_minutes,
                   is_public, is_default, creator_id
            FROM routines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        record.map(Routine::try_from).transpose()
    }

    /// Exercises of a routine in execution order
    pub async fn get_exercises(pool: &PgPool, routine_id: Uuid) -> StoreResult<Vec<RoutineExercise>> {
        let records = sqlx::query_as::<_, ExerciseRecord>(
            r#"
            SELECT id, routine_id, name, description, sets, reps, rest_seconds, order_index
            FROM exercises
            WHERE routine_id = $1
            ORDER BY order_index, id
            "#,
        )
        .bind(routine_id)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_record_conversion() {
        let record = RoutineRecord {
            id: Uuid::new_v4(),
            title: "Push day".to_string(),
            description: String::new(),
            difficulty: "advanced".to_string(),
            duration_minutes: 50,
            is_public: true,
            is_default: true,
            creator_id: None,
        };
        let routine = Routine::try_from(record).unwrap();
        assert_eq!(routine.difficulty.as_str(), "advanced");
    }

    #[test]
    fn test_unknown_difficulty_is_invalid_data() {
        let record = RoutineRecord {
            id: Uuid::new_v4(),
            title: "Odd".to_string(),
            description: String::new(),
            difficulty: "legendary".to_string(),
            duration_minutes: 10,
            is_public: false,
            is_default: false,
            creator_id: None,
        };
        assert!(matches!(
            Routine::try_from(record),
            Err(StoreError::InvalidData(_))
        ));
    }
}
