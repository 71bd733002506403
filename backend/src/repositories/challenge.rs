//! Challenge repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tracer_shared::models::{AcceptedChallenge, Challenge, UserChallenge};

use super::store::{StoreError, StoreResult};

/// Challenge record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChallengeRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub category: String,
    pub target_value: i32,
    pub stat_type: String,
    pub is_active: bool,
}

impl TryFrom<ChallengeRecord> for Challenge {
    type Error = StoreError;

    fn try_from(r: ChallengeRecord) -> Result<Self, Self::Error> {
        Ok(Challenge {
            id: r.id,
            title: r.title,
            description: r.description,
            difficulty: r.difficulty.parse().map_err(StoreError::InvalidData)?,
            category: r.category,
            target_value: r.target_value,
            stat_type: r.stat_type.parse().map_err(StoreError::InvalidData)?,
            is_active: r.is_active,
        })
    }
}

/// User challenge record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserChallengeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub progress: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<UserChallengeRecord> for UserChallenge {
    fn from(r: UserChallengeRecord) -> Self {
        UserChallenge {
            id: r.id,
            user_id: r.user_id,
            challenge_id: r.challenge_id,
            progress: r.progress,
            completed: r.completed,
            completed_at: r.completed_at,
        }
    }
}

/// User challenge joined with its definition
#[derive(Debug, Clone, sqlx::FromRow)]
struct AcceptedRecord {
    id: Uuid,
    user_id: Uuid,
    challenge_id: Uuid,
    progress: i32,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    title: String,
    description: String,
    difficulty: String,
    category: String,
    target_value: i32,
    stat_type: String,
    is_active: bool,
}

impl TryFrom<AcceptedRecord> for AcceptedChallenge {
    type Error = StoreError;

    fn try_from(r: AcceptedRecord) -> Result<Self, Self::Error> {
        let challenge = ChallengeRecord {
            id: r.challenge_id,
            title: r.title,
            description: r.description,
            difficulty: r.difficulty,
            category: r.category,
            target_value: r.target_value,
            stat_type: r.stat_type,
            is_active: r.is_active,
        }
        .try_into()?;

        Ok(AcceptedChallenge {
            entry: UserChallenge {
                id: r.id,
                user_id: r.user_id,
                challenge_id: r.challenge_id,
                progress: r.progress,
                completed: r.completed,
                completed_at: r.completed_at,
            },
            challenge,
        })
    }
}

/// Challenge repository
pub struct ChallengeRepository;

impl ChallengeRepository {
    pub async fn get_active(pool: &PgPool) -> StoreResult<Vec<Challenge>> {
        let records = sqlx::query_as::<_, ChallengeRecord>(
            r#"
            SELECT id, title, description, difficulty, category, target_value, stat_type, is_active
            FROM challenges
            WHERE is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        records.into_iter().map(Challenge::try_from).collect()
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<Challenge>> {
        let record = sqlx::query_as::<_, ChallengeRecord>(
            r#"
            SELECT id, title, description, difficulty, category, target_value, stat_type, is_active
            FROM challenges
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        record.map(Challenge::try_from).transpose()
    }

    /// Accept a challenge. A second acceptance hits the unique key and
    /// surfaces as a conflict.
    pub async fn accept(
        pool: &PgPool,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> StoreResult<UserChallenge> {
        let record = sqlx::query_as::<_, UserChallengeRecord>(
            r#"
            INSERT INTO user_challenges (user_id, challenge_id)
            VALUES ($1, $2)
            RETURNING id, user_id, challenge_id, progress, completed, completed_at
            "#,
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_one(pool)
        .await?;

        Ok(record.into())
    }

    pub async fn get_for_user(pool: &PgPool, user_id: Uuid) -> StoreResult<Vec<AcceptedChallenge>> {
        let records = sqlx::query_as::<_, AcceptedRecord>(
            r#"
            SELECT uc.id, uc.user_id, uc.challenge_id, uc.progress, uc.completed, uc.completed_at,
                   c.title, c.description, c.difficulty, c.category, c.target_value,
                   c.stat_type, c.is_active
            FROM user_challenges uc
            JOIN challenges c ON c.id = uc.challenge_id
            WHERE uc.user_id = $1
            ORDER BY uc.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        records.into_iter().map(AcceptedChallenge::try_from).collect()
    }

    /// Record progress; a `completed_at` marks the challenge completed
    pub async fn update_progress(
        pool: &PgPool,
        id: Uuid,
        progress: i32,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<UserChallenge> {
        let record = sqlx::query_as::<_, UserChallengeRecord>(
            r#"
            UPDATE user_challenges
            SET progress = $2,
                completed = completed OR $3::timestamptz IS NOT NULL,
                completed_at = COALESCE(completed_at, $3)
            WHERE id = $1
            RETURNING id, user_id, challenge_id, progress, completed, completed_at
            "#,
        )
        .bind(id)
        .bind(progress)
        .bind(completed_at)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("User challenge {}", id)))?;

        Ok(record.into())
    }
}
