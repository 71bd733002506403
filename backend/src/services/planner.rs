//! Planner service - weekly routine assignments and day statuses

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

use tracer_shared::models::{DayOfWeek, PlanEntry, WorkoutSession};
use tracer_shared::planner::{date_for, week_overview, week_start};
use tracer_shared::progression::{REASON_WORKOUT_COMPLETED, WORKOUT_COMPLETED_XP};
use tracer_shared::types::{DayStatusResponse, ManualStatus, PlannerResponse, TodayRoutineResponse};

use crate::error::{ApiError, ApiResult};
use crate::repositories::Store;

use super::progression::ProgressionService;
use super::retry::RetryPolicy;

/// Planner service
pub struct PlannerService;

impl PlannerService {
    /// Plan and statuses for the week containing `today`
    pub async fn week(store: &dyn Store, user_id: Uuid, today: NaiveDate) -> ApiResult<PlannerResponse> {
        let monday = week_start(today);
        let plan = store.weekly_plan(user_id).await?;
        let sessions = store
            .sessions_between(user_id, monday, monday + Duration::days(6))
            .await?;

        Ok(PlannerResponse {
            week_start: monday,
            today: DayOfWeek::of(today),
            days: week_overview(today, &plan, &sessions),
        })
    }

    /// Assign a routine to `day`, or clear the day when `routine_id` is `None`
    pub async fn assign(
        store: &dyn Store,
        user_id: Uuid,
        day: DayOfWeek,
        routine_id: Option<Uuid>,
    ) -> ApiResult<Option<PlanEntry>> {
        match routine_id {
            Some(routine_id) => {
                store
                    .routine(routine_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("Routine {} not found", routine_id)))?;
                let entry = store.assign_day(user_id, day, routine_id).await?;
                info!(%user_id, %day, %routine_id, "Routine planned");
                Ok(Some(entry))
            }
            None => {
                store.clear_day(user_id, day).await?;
                info!(%user_id, %day, "Day cleared");
                Ok(None)
            }
        }
    }

    /// Routine planned for `today`, with its exercises
    pub async fn today(store: &dyn Store, user_id: Uuid, today: NaiveDate) -> ApiResult<TodayRoutineResponse> {
        let day = DayOfWeek::of(today);
        let routine = match store.plan_for_day(user_id, day).await? {
            Some(entry) => store.routine(entry.routine_id).await?,
            None => None,
        };
        let exercises = match &routine {
            Some(routine) => store.routine_exercises(routine.id).await?,
            None => Vec::new(),
        };

        Ok(TodayRoutineResponse {
            day,
            date: today,
            routine,
            exercises,
        })
    }

    /// Set the completed flag of a day's session by hand.
    ///
    /// Without a session the one for the planned routine is created. Moving a
    /// session to completed awards the workout experience.
    pub async fn set_day_status(
        store: &dyn Store,
        retry: &RetryPolicy,
        user_id: Uuid,
        day: DayOfWeek,
        status: ManualStatus,
        today: NaiveDate,
    ) -> ApiResult<DayStatusResponse> {
        let date = date_for(day, today);
        let session = Self::session_for_day(store, user_id, day, date).await?;
        let completed = status == ManualStatus::Completed;

        if session.completed == completed {
            return Ok(DayStatusResponse {
                day,
                date,
                session,
                experience_awarded: 0,
            });
        }

        let session = store.set_session_completed(session.id, completed).await?;
        let mut experience_awarded = 0;
        if completed {
            match ProgressionService::award_experience(
                store,
                retry,
                user_id,
                WORKOUT_COMPLETED_XP,
                REASON_WORKOUT_COMPLETED,
                Some(session.id),
            )
            .await
            {
                Ok(_) => experience_awarded = WORKOUT_COMPLETED_XP,
                Err(err) => warn!(%user_id, session_id = %session.id, error = %err, "Manual completion experience not awarded"),
            }
        }

        info!(%user_id, %day, %date, completed, "Day status updated");
        Ok(DayStatusResponse {
            day,
            date,
            session,
            experience_awarded,
        })
    }

    async fn session_for_day(
        store: &dyn Store,
        user_id: Uuid,
        day: DayOfWeek,
        date: NaiveDate,
    ) -> ApiResult<WorkoutSession> {
        let sessions = store.sessions_on(user_id, date).await?;
        if let Some(session) = sessions.iter().find(|s| s.completed).or(sessions.first()) {
            return Ok(session.clone());
        }

        let entry = store
            .plan_for_day(user_id, day)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No routine planned for {}", day)))?;
        Ok(store
            .find_or_create_session(user_id, entry.routine_id, date)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryStore, PlanStore, ProfileStore};
    use tracer_shared::models::{Difficulty, Profile, Routine, SkillStats};
    use tracer_shared::planner::DayStatus;

    // 2024-05-15 is a Wednesday
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    async fn setup() -> (InMemoryStore, Uuid, Uuid) {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let routine = Routine {
            id: Uuid::new_v4(),
            title: "Upper".to_string(),
            description: String::new(),
            difficulty: Difficulty::Intermediate,
            duration_minutes: 40,
            is_public: true,
            is_default: true,
            creator_id: None,
        };
        let routine_id = routine.id;
        store.insert_routine(routine, Vec::new()).await;
        store
            .insert_profile(Profile {
                id: user_id,
                username: "planner".to_string(),
                full_name: "Planner".to_string(),
                is_public: false,
                stats: SkillStats::default(),
                experience: 0,
            })
            .await;
        (store, user_id, routine_id)
    }

    #[tokio::test]
    async fn test_assign_and_clear() {
        let (store, user_id, routine_id) = setup().await;

        let entry = PlannerService::assign(&store, user_id, DayOfWeek::Monday, Some(routine_id))
            .await
            .unwrap();
        assert_eq!(entry.unwrap().routine_id, routine_id);

        PlannerService::assign(&store, user_id, DayOfWeek::Monday, None)
            .await
            .unwrap();
        assert!(store.weekly_plan(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_unknown_routine_not_found() {
        let (store, user_id, _) = setup().await;
        let result =
            PlannerService::assign(&store, user_id, DayOfWeek::Friday, Some(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_week_reports_skipped_and_pending() {
        let (store, user_id, routine_id) = setup().await;
        for day in [DayOfWeek::Monday, DayOfWeek::Wednesday] {
            store.assign_day(user_id, day, routine_id).await.unwrap();
        }

        let week = PlannerService::week(&store, user_id, wednesday()).await.unwrap();
        assert_eq!(week.today, DayOfWeek::Wednesday);
        assert_eq!(week.days[0].status, Some(DayStatus::Skipped));
        assert_eq!(week.days[2].status, Some(DayStatus::Pending));
    }

    #[tokio::test]
    async fn test_manual_completion_awards_once() {
        let (store, user_id, routine_id) = setup().await;
        store
            .assign_day(user_id, DayOfWeek::Monday, routine_id)
            .await
            .unwrap();
        let retry = RetryPolicy::none();

        let first = PlannerService::set_day_status(
            &store,
            &retry,
            user_id,
            DayOfWeek::Monday,
            ManualStatus::Completed,
            wednesday(),
        )
        .await
        .unwrap();
        assert!(first.session.completed);
        assert_eq!(first.experience_awarded, WORKOUT_COMPLETED_XP);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());

        let again = PlannerService::set_day_status(
            &store,
            &retry,
            user_id,
            DayOfWeek::Monday,
            ManualStatus::Completed,
            wednesday(),
        )
        .await
        .unwrap();
        assert_eq!(again.experience_awarded, 0);
        assert_eq!(again.session.id, first.session.id);

        let profile = store.profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.experience, WORKOUT_COMPLETED_XP);
    }

    #[tokio::test]
    async fn test_unplanned_day_without_session_not_found() {
        let (store, user_id, _) = setup().await;
        let result = PlannerService::set_day_status(
            &store,
            &RetryPolicy::none(),
            user_id,
            DayOfWeek::Tuesday,
            ManualStatus::Completed,
            wednesday(),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_today_without_plan() {
        let (store, user_id, _) = setup().await;
        let today = PlannerService::today(&store, user_id, wednesday()).await.unwrap();
        assert_eq!(today.day, DayOfWeek::Wednesday);
        assert!(today.routine.is_none());
    }
}
