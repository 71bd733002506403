//! Challenge service - acceptance and evaluation against skill stats

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use tracer_shared::models::{AcceptedChallenge, Challenge, UserChallenge};
use tracer_shared::progression::{
    challenge_reward, evaluate_challenge, ChallengeOutcome, REASON_CHALLENGE_COMPLETED,
};
use tracer_shared::types::{ChallengeEvaluation, EvaluateChallengesResponse};

use crate::error::{ApiError, ApiResult};
use crate::repositories::Store;

use super::progression::ProgressionService;
use super::retry::RetryPolicy;

/// Challenge service
pub struct ChallengeService;

impl ChallengeService {
    pub async fn list_active(store: &dyn Store) -> ApiResult<Vec<Challenge>> {
        Ok(store.active_challenges().await?)
    }

    pub async fn mine(store: &dyn Store, user_id: Uuid) -> ApiResult<Vec<AcceptedChallenge>> {
        Ok(store.user_challenges(user_id).await?)
    }

    /// Accept an active challenge. Accepting twice is a conflict.
    pub async fn accept(store: &dyn Store, user_id: Uuid, challenge_id: Uuid) -> ApiResult<UserChallenge> {
        let challenge = store
            .challenge(challenge_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| ApiError::NotFound(format!("Challenge {} not found", challenge_id)))?;

        let entry = store.accept_challenge(user_id, challenge.id).await?;
        info!(%user_id, challenge_id = %challenge.id, "Challenge accepted");
        Ok(entry)
    }

    /// Compare every accepted challenge with the user's current stats.
    ///
    /// Reaching the target completes the challenge and awards its reward; a
    /// completed challenge is never evaluated again.
    pub async fn evaluate(
        store: &dyn Store,
        retry: &RetryPolicy,
        user_id: Uuid,
    ) -> ApiResult<EvaluateChallengesResponse> {
        let profile = store
            .profile(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Profile {} not found", user_id)))?;
        let accepted = store.user_challenges(user_id).await?;

        let mut evaluations = Vec::with_capacity(accepted.len());
        let mut total_awarded = 0;

        for AcceptedChallenge { entry, challenge } in accepted {
            let current = profile.stats.get(challenge.stat_type);
            let outcome = evaluate_challenge(
                entry.completed,
                entry.progress,
                challenge.target_value,
                current,
            );

            let (entry, awarded) = match outcome {
                ChallengeOutcome::Unchanged => (entry, 0),
                ChallengeOutcome::Progressed(progress) => {
                    let updated = store
                        .update_challenge_progress(entry.id, progress, None)
                        .await?;
                    (updated, 0)
                }
                ChallengeOutcome::Completed(progress) => {
                    let updated = store
                        .update_challenge_progress(entry.id, progress, Some(Utc::now()))
                        .await?;
                    let reward = challenge_reward(challenge.difficulty);
                    ProgressionService::award_experience(
                        store,
                        retry,
                        user_id,
                        reward,
                        REASON_CHALLENGE_COMPLETED,
                        Some(updated.id),
                    )
                    .await?;
                    metrics::counter!("tracer_challenges_completed_total").increment(1);
                    info!(%user_id, challenge_id = %challenge.id, reward, "Challenge completed");
                    (updated, reward)
                }
            };

            total_awarded += awarded;
            evaluations.push(ChallengeEvaluation {
                user_challenge_id: entry.id,
                challenge_id: challenge.id,
                title: challenge.title,
                progress: entry.progress,
                target_value: challenge.target_value,
                completed: entry.completed,
                experience_awarded: awarded,
            });
        }

        Ok(EvaluateChallengesResponse {
            evaluations,
            experience_awarded: total_awarded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStore, ProfileStore};
    use tracer_shared::models::{Difficulty, Profile, SkillStats, StatKind};

    fn challenge(stat: StatKind, target: i32, difficulty: Difficulty, active: bool) -> Challenge {
        Challenge {
            id: Uuid::new_v4(),
            title: format!("Reach {} {}", target, stat),
            description: String::new(),
            difficulty,
            category: "strength".to_string(),
            target_value: target,
            stat_type: stat,
            is_active: active,
        }
    }

    async fn store_with_stats(stats: SkillStats) -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        store
            .insert_profile(Profile {
                id: user_id,
                username: "challenger".to_string(),
                full_name: "Challenger".to_string(),
                is_public: true,
                stats,
                experience: 0,
            })
            .await;
        (store, user_id)
    }

    #[tokio::test]
    async fn test_accept_rules() {
        let (store, user_id) = store_with_stats(SkillStats::default()).await;
        let active = challenge(StatKind::Fuerza, 20, Difficulty::Beginner, true);
        let retired = challenge(StatKind::Fuerza, 20, Difficulty::Beginner, false);
        let (active_id, retired_id) = (active.id, retired.id);
        store.insert_challenge(active).await;
        store.insert_challenge(retired).await;

        ChallengeService::accept(&store, user_id, active_id).await.unwrap();
        let dup = ChallengeService::accept(&store, user_id, active_id).await;
        assert!(matches!(dup, Err(ApiError::Store(crate::repositories::StoreError::Conflict(_)))));

        let inactive = ChallengeService::accept(&store, user_id, retired_id).await;
        assert!(matches!(inactive, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_evaluate_awards_once() {
        let stats = SkillStats {
            fuerza: 30,
            resistencia: 10,
            ..SkillStats::default()
        };
        let (store, user_id) = store_with_stats(stats).await;
        let reached = challenge(StatKind::Fuerza, 25, Difficulty::Intermediate, true);
        let pending = challenge(StatKind::Resistencia, 40, Difficulty::Advanced, true);
        let (reached_id, pending_id) = (reached.id, pending.id);
        store.insert_challenge(reached).await;
        store.insert_challenge(pending).await;
        ChallengeService::accept(&store, user_id, reached_id).await.unwrap();
        ChallengeService::accept(&store, user_id, pending_id).await.unwrap();
        let retry = RetryPolicy::none();

        let first = ChallengeService::evaluate(&store, &retry, user_id).await.unwrap();
        assert_eq!(first.experience_awarded, 50);
        let done = first
            .evaluations
            .iter()
            .find(|e| e.challenge_id == reached_id)
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.progress, 30);
        let open = first
            .evaluations
            .iter()
            .find(|e| e.challenge_id == pending_id)
            .unwrap();
        assert!(!open.completed);
        assert_eq!(open.progress, 10);

        let second = ChallengeService::evaluate(&store, &retry, user_id).await.unwrap();
        assert_eq!(second.experience_awarded, 0);

        let profile = store.profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.experience, 50);
        let history = store.recent_experience(user_id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, REASON_CHALLENGE_COMPLETED);
    }
}
