//! Profile and experience history repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tracer_shared::models::{ExperienceEntry, NewExperienceEntry, Profile, SkillStats};
use tracer_shared::progression::level_from_experience;

use super::store::{StoreError, StoreResult};

/// Profile record from database
///
/// `level` is a cache of `level_from_experience(experience)` kept for other
/// readers of the table; it is never read back into the domain type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub is_public: bool,
    pub fuerza: i32,
    pub resistencia: i32,
    pub tecnica: i32,
    pub definicion: i32,
    pub constancia: i32,
    pub experience: i32,
    pub level: String,
}

impl From<ProfileRecord> for Profile {
    fn from(r: ProfileRecord) -> Self {
        Profile {
            id: r.id,
            username: r.username,
            full_name: r.full_name,
            is_public: r.is_public,
            stats: SkillStats {
                fuerza: r.fuerza,
                resistencia: r.resistencia,
                tecnica: r.tecnica,
                definicion: r.definicion,
                constancia: r.constancia,
            },
            experience: r.experience,
        }
    }
}

/// Experience history record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExperienceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub reason: String,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<ExperienceRecord> for ExperienceEntry {
    fn from(r: ExperienceRecord) -> Self {
        ExperienceEntry {
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            reason: r.reason,
            related_id: r.related_id,
            created_at: r.created_at,
        }
    }
}

const PROFILE_COLUMNS: &str = "id, username, full_name, is_public, fuerza, resistencia, \
     tecnica, definicion, constancia, experience, level";

/// Profile repository
pub struct ProfileRepository;

impl ProfileRepository {
    /// Get profile by user ID
    pub async fn get_by_id(pool: &PgPool, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Overwrite all five stats
    pub async fn update_stats(
        pool: &PgPool,
        user_id: Uuid,
        stats: SkillStats,
    ) -> StoreResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            r#"
            UPDATE profiles
            SET fuerza = $2, resistencia = $3, tecnica = $4, definicion = $5,
                constancia = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(stats.fuerza)
        .bind(stats.resistencia)
        .bind(stats.tecnica)
        .bind(stats.definicion)
        .bind(stats.constancia)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile {}", user_id)))?;

        Ok(record.into())
    }

    /// Write experience together with the level derived from it
    pub async fn update_experience(
        pool: &PgPool,
        user_id: Uuid,
        experience: i32,
    ) -> StoreResult<Profile> {
        let level = level_from_experience(experience);

        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            r#"
            UPDATE profiles
            SET experience = $2, level = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(experience)
        .bind(level.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile {}", user_id)))?;

        Ok(record.into())
    }

    pub async fn set_visibility(
        pool: &PgPool,
        user_id: Uuid,
        is_public: bool,
    ) -> StoreResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "UPDATE profiles SET is_public = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(is_public)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile {}", user_id)))?;

        Ok(record.into())
    }

    /// Append an experience history record
    pub async fn insert_experience(
        pool: &PgPool,
        entry: NewExperienceEntry,
    ) -> StoreResult<ExperienceEntry> {
        let record = sqlx::query_as::<_, ExperienceRecord>(
            r#"
            INSERT INTO experience_history (user_id, amount, reason, related_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, amount, reason, related_id, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(&entry.reason)
        .bind(entry.related_id)
        .fetch_one(pool)
        .await?;

        Ok(record.into())
    }

    /// Most recent history records, newest first
    pub async fn recent_experience(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<ExperienceEntry>> {
        let records = sqlx::query_as::<_, ExperienceRecord>(
            r#"
            SELECT id, user_id, amount, reason, related_id, created_at
            FROM experience_history
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
