//! Profile service - progress summaries and visibility

use uuid::Uuid;

use tracer_shared::models::{ExperienceEntry, Profile, StatKind};
use tracer_shared::progression::{experience_to_next_rank, stat_rank};
use tracer_shared::types::{ProgressSummary, StatView};

use crate::error::{ApiError, ApiResult};
use crate::repositories::Store;

/// History entries included in a progress summary
pub const SUMMARY_HISTORY_LIMIT: i64 = 5;

/// Default page size for the experience history
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Profile service
pub struct ProfileService;

impl ProfileService {
    async fn load(store: &dyn Store, user_id: Uuid) -> ApiResult<Profile> {
        store
            .profile(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Profile {} not found", user_id)))
    }

    /// Progress summary of the caller
    pub async fn progress(store: &dyn Store, user_id: Uuid) -> ApiResult<ProgressSummary> {
        let profile = Self::load(store, user_id).await?;
        Self::summarize(store, profile).await
    }

    /// Progress summary of another user, visible only when their profile is public
    pub async fn public_progress(
        store: &dyn Store,
        viewer_id: Uuid,
        user_id: Uuid,
    ) -> ApiResult<ProgressSummary> {
        let profile = Self::load(store, user_id).await?;
        if profile.id != viewer_id && !profile.is_public {
            return Err(ApiError::Forbidden("This profile is private".to_string()));
        }
        Self::summarize(store, profile).await
    }

    pub async fn set_visibility(store: &dyn Store, user_id: Uuid, is_public: bool) -> ApiResult<ProgressSummary> {
        let profile = store.set_visibility(user_id, is_public).await?;
        Self::summarize(store, profile).await
    }

    pub async fn experience_history(
        store: &dyn Store,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> ApiResult<Vec<ExperienceEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        Ok(store.recent_experience(user_id, limit).await?)
    }

    async fn summarize(store: &dyn Store, profile: Profile) -> ApiResult<ProgressSummary> {
        let counts = store.session_counts(profile.id).await?;
        let recent_experience = store
            .recent_experience(profile.id, SUMMARY_HISTORY_LIMIT)
            .await?;

        let level = profile.level();
        let stats = StatKind::ALL
            .iter()
            .map(|&stat| {
                let value = profile.stats.get(stat);
                StatView {
                    stat,
                    value,
                    rank: stat_rank(value),
                }
            })
            .collect();

        Ok(ProgressSummary {
            user_id: profile.id,
            username: profile.username,
            full_name: profile.full_name,
            is_public: profile.is_public,
            level,
            experience: profile.experience,
            next_rank: level.next(),
            experience_to_next_rank: experience_to_next_rank(profile.experience),
            stats,
            average_stat: profile.stats.average(),
            total_sessions: counts.total,
            completed_sessions: counts.completed,
            completion_rate: counts.completion_rate(),
            recent_experience,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryStore;
    use chrono::Utc;
    use tracer_shared::models::{SkillStats, WorkoutSession};
    use tracer_shared::progression::Rank;

    async fn store_with(is_public: bool, experience: i32) -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store
            .insert_profile(Profile {
                id,
                username: "summit".to_string(),
                full_name: "Summit".to_string(),
                is_public,
                stats: SkillStats {
                    fuerza: 92,
                    resistencia: 81,
                    tecnica: 70,
                    definicion: 65,
                    constancia: 12,
                },
                experience,
            })
            .await;
        (store, id)
    }

    #[tokio::test]
    async fn test_summary_fields() {
        let (store, id) = store_with(false, 260).await;
        let today = Utc::now().date_naive();
        for completed in [true, true, false] {
            store
                .insert_session(WorkoutSession {
                    id: Uuid::new_v4(),
                    user_id: id,
                    routine_id: Uuid::new_v4(),
                    date: today,
                    completed,
                    duration_minutes: 30,
                    notes: None,
                })
                .await;
        }

        let summary = ProfileService::progress(&store, id).await.unwrap();
        assert_eq!(summary.level, Rank::C);
        assert_eq!(summary.next_rank, Some(Rank::B));
        assert_eq!(summary.experience_to_next_rank, Some(140));
        assert_eq!(summary.stats[0].rank, Rank::S);
        assert_eq!(summary.stats[1].rank, Rank::A);
        assert_eq!(summary.stats[4].rank, Rank::E);
        assert_eq!(summary.average_stat, 64);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.completion_rate, 67);
    }

    #[tokio::test]
    async fn test_private_profile_hidden_from_others() {
        let (store, id) = store_with(false, 0).await;

        let other = ProfileService::public_progress(&store, Uuid::new_v4(), id).await;
        assert!(matches!(other, Err(ApiError::Forbidden(_))));
        assert!(ProfileService::public_progress(&store, id, id).await.is_ok());

        ProfileService::set_visibility(&store, id, true).await.unwrap();
        assert!(ProfileService::public_progress(&store, Uuid::new_v4(), id)
            .await
            .is_ok());
    }
}
