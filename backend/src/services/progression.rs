//! Progression service - experience awards and stat increases
//!
//! All experience changes go through [`ProgressionService::award_experience`],
//! which writes the new total (and with it the cached level) and appends a
//! history record.

use tracing::{info, instrument};
use uuid::Uuid;

use tracer_shared::models::{ExperienceEntry, NewExperienceEntry, Profile};
use tracer_shared::progression::{level_from_experience, Rank};
use tracer_shared::validation::{check, validate_experience_amount, validate_reason};

use crate::error::{ApiError, ApiResult};
use crate::repositories::Store;

use super::retry::RetryPolicy;

/// Result of an experience award
#[derive(Debug, Clone)]
pub struct ExperienceAward {
    pub profile: Profile,
    pub entry: ExperienceEntry,
    pub previous_level: Rank,
    pub level: Rank,
}

impl ExperienceAward {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Progression service for experience and stats
pub struct ProgressionService;

impl ProgressionService {
    async fn load_profile(store: &dyn Store, retry: &RetryPolicy, user_id: Uuid) -> ApiResult<Profile> {
        retry
            .run("profile", || store.profile(user_id))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Profile {} not found", user_id)))
    }

    /// Add `amount` experience, keep the level in sync and record why
    #[instrument(skip(store, retry))]
    pub async fn award_experience(
        store: &dyn Store,
        retry: &RetryPolicy,
        user_id: Uuid,
        amount: i32,
        reason: &str,
        related_id: Option<Uuid>,
    ) -> ApiResult<ExperienceAward> {
        check("amount", validate_experience_amount(amount))?;
        check("reason", validate_reason(reason))?;

        let profile = Self::load_profile(store, retry, user_id).await?;
        let previous_level = profile.level();
        let experience = profile.experience.saturating_add(amount);

        let profile = retry
            .run("update_experience", || store.update_experience(user_id, experience))
            .await?;

        let new_entry = NewExperienceEntry {
            user_id,
            amount,
            reason: reason.to_string(),
            related_id,
        };
        let entry = retry
            .run("insert_experience", || store.insert_experience(new_entry.clone()))
            .await?;

        let level = level_from_experience(profile.experience);
        metrics::counter!("tracer_experience_awarded_total").increment(amount as u64);
        if level > previous_level {
            info!(%user_id, from = %previous_level, to = %level, "Rank up");
        }

        Ok(ExperienceAward {
            profile,
            entry,
            previous_level,
            level,
        })
    }

    /// Add `delta` to all five stats, each clamped to [0, 100]
    #[instrument(skip(store, retry))]
    pub async fn apply_stat_increase(
        store: &dyn Store,
        retry: &RetryPolicy,
        user_id: Uuid,
        delta: i32,
    ) -> ApiResult<Profile> {
        let profile = Self::load_profile(store, retry, user_id).await?;
        let stats = profile.stats.with_increase(delta);

        let profile = retry
            .run("update_stats", || store.update_stats(user_id, stats))
            .await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStore, ProfileStore, StoreOp};
    use tracer_shared::models::SkillStats;
    use tracer_shared::progression::REASON_WORKOUT_COMPLETED;

    async fn store_with_profile(experience: i32, stats: SkillStats) -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store
            .insert_profile(Profile {
                id,
                username: "lifter".to_string(),
                full_name: "Lifter".to_string(),
                is_public: false,
                stats,
                experience,
            })
            .await;
        (store, id)
    }

    #[tokio::test]
    async fn test_award_crosses_rank_threshold() {
        let (store, id) = store_with_profile(45, SkillStats::default()).await;

        let award = ProgressionService::award_experience(
            &store,
            &RetryPolicy::none(),
            id,
            10,
            REASON_WORKOUT_COMPLETED,
            None,
        )
        .await
        .unwrap();

        assert_eq!(award.profile.experience, 55);
        assert_eq!(award.previous_level, Rank::E);
        assert_eq!(award.level, Rank::D);
        assert!(award.leveled_up());
        assert_eq!(store.cached_level(id).await, Some(Rank::D));
        assert_eq!(award.entry.reason, REASON_WORKOUT_COMPLETED);
    }

    #[tokio::test]
    async fn test_zero_award_still_recorded() {
        let (store, id) = store_with_profile(100, SkillStats::default()).await;

        let award =
            ProgressionService::award_experience(&store, &RetryPolicy::none(), id, 0, "bonus", None)
                .await
                .unwrap();

        assert_eq!(award.profile.experience, 100);
        assert!(!award.leveled_up());
        assert_eq!(store.recent_experience(id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_awards_rejected() {
        let (store, id) = store_with_profile(0, SkillStats::default()).await;
        let retry = RetryPolicy::none();

        let negative =
            ProgressionService::award_experience(&store, &retry, id, -5, "penalty", None).await;
        assert!(matches!(negative, Err(ApiError::Validation(_))));

        let bad_reason =
            ProgressionService::award_experience(&store, &retry, id, 5, "Not Snake", None).await;
        assert!(matches!(bad_reason, Err(ApiError::Validation(_))));
        assert_eq!(store.calls(StoreOp::UpdateExperience).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_profile_not_found() {
        let store = InMemoryStore::new();
        let result = ProgressionService::award_experience(
            &store,
            &RetryPolicy::none(),
            Uuid::new_v4(),
            10,
            REASON_WORKOUT_COMPLETED,
            None,
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stat_increase_clamps() {
        let stats = SkillStats {
            fuerza: 99,
            resistencia: 40,
            tecnica: 100,
            definicion: 0,
            constancia: 98,
        };
        let (store, id) = store_with_profile(0, stats).await;

        let profile =
            ProgressionService::apply_stat_increase(&store, &RetryPolicy::none(), id, 2)
                .await
                .unwrap();

        assert_eq!(profile.stats.fuerza, 100);
        assert_eq!(profile.stats.resistencia, 42);
        assert_eq!(profile.stats.tecnica, 100);
        assert_eq!(profile.stats.definicion, 2);
        assert_eq!(profile.stats.constancia, 100);
    }
}
