//! In-memory store
//!
//! Implements the store traits over plain collections. Used by the test suite
//! and for running the service without a database. Failures can be injected
//! per operation to exercise retry and degraded-completion paths.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use tracer_shared::models::{
    AcceptedChallenge, Challenge, DayOfWeek, ExperienceEntry, NewExperienceEntry, PlanEntry,
    Profile, Routine, RoutineExercise, SessionCounts, SkillStats, UserChallenge, WorkoutSession,
};
use tracer_shared::progression::{level_from_experience, Rank};

use super::store::{
    ChallengeStore, PlanStore, ProfileStore, SessionStore, StoreError, StoreResult,
};

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Ping,
    Routine,
    RoutineExercises,
    FindOrCreateSession,
    SessionsOn,
    CompleteSession,
    SetSessionCompleted,
    SessionsBetween,
    SessionCounts,
    Profile,
    UpdateStats,
    UpdateExperience,
    SetVisibility,
    InsertExperience,
    RecentExperience,
    WeeklyPlan,
    PlanForDay,
    AssignDay,
    ClearDay,
    ActiveChallenges,
    Challenge,
    AcceptChallenge,
    UserChallenges,
    UpdateChallengeProgress,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Times(u32),
    Always,
}

#[derive(Default)]
struct MemoryState {
    routines: HashMap<Uuid, Routine>,
    exercises: Vec<RoutineExercise>,
    sessions: Vec<WorkoutSession>,
    profiles: HashMap<Uuid, Profile>,
    levels: HashMap<Uuid, Rank>,
    experience: Vec<ExperienceEntry>,
    plans: BTreeMap<(Uuid, DayOfWeek), Uuid>,
    challenges: Vec<Challenge>,
    user_challenges: Vec<UserChallenge>,
}

/// Store backed by in-process collections
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    failures: Mutex<HashMap<StoreOp, Failure>>,
    calls: Mutex<HashMap<StoreOp, u32>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub async fn insert_routine(&self, routine: Routine, exercises: Vec<RoutineExercise>) {
        let mut state = self.state.lock().await;
        state.exercises.retain(|e| e.routine_id != routine.id);
        state.exercises.extend(exercises);
        state.routines.insert(routine.id, routine);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        let mut state = self.state.lock().await;
        state
            .levels
            .insert(profile.id, level_from_experience(profile.experience));
        state.profiles.insert(profile.id, profile);
    }

    pub async fn insert_challenge(&self, challenge: Challenge) {
        self.state.lock().await.challenges.push(challenge);
    }

    pub async fn insert_session(&self, session: WorkoutSession) {
        self.state.lock().await.sessions.push(session);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// All sessions of a user in insertion order
    pub async fn sessions(&self, user_id: Uuid) -> Vec<WorkoutSession> {
        self.state
            .lock()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Cached level as last written by `update_experience`
    pub async fn cached_level(&self, user_id: Uuid) -> Option<Rank> {
        self.state.lock().await.levels.get(&user_id).copied()
    }

    /// Number of times an operation was attempted, failed attempts included
    pub async fn calls(&self, op: StoreOp) -> u32 {
        self.calls.lock().await.get(&op).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Failure injection
    // ------------------------------------------------------------------

    /// Fail the next `times` calls of `op`
    pub async fn fail_times(&self, op: StoreOp, times: u32) {
        self.failures.lock().await.insert(op, Failure::Times(times));
    }

    /// Fail every call of `op` until healed
    pub async fn fail_always(&self, op: StoreOp) {
        self.failures.lock().await.insert(op, Failure::Always);
    }

    pub async fn heal(&self, op: StoreOp) {
        self.failures.lock().await.remove(&op);
    }

    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        *self.calls.lock().await.entry(op).or_insert(0) += 1;

        let mut failures = self.failures.lock().await;
        let failing = match failures.get_mut(&op) {
            Some(Failure::Always) => true,
            Some(Failure::Times(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if failing {
            return Err(StoreError::Unavailable(format!("injected failure for {:?}", op)));
        }
        Ok(())
    }
}

fn profile_not_found(user_id: Uuid) -> StoreError {
    StoreError::NotFound(format!("Profile {}", user_id))
}

fn session_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound(format!("Session {}", id))
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.enter(StoreOp::Ping).await
    }

    async fn routine(&self, id: Uuid) -> StoreResult<Option<Routine>> {
        self.enter(StoreOp::Routine).await?;
        Ok(self.state.lock().await.routines.get(&id).cloned())
    }

    async fn routine_exercises(&self, routine_id: Uuid) -> StoreResult<Vec<RoutineExercise>> {
        self.enter(StoreOp::RoutineExercises).await?;
        let mut exercises: Vec<RoutineExercise> = self
            .state
            .lock()
            .await
            .exercises
            .iter()
            .filter(|e| e.routine_id == routine_id)
            .cloned()
            .collect();
        exercises.sort_by_key(|e| e.order_index);
        Ok(exercises)
    }

    async fn find_or_create_session(
        &self,
        user_id: Uuid,
        routine_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<WorkoutSession> {
        self.enter(StoreOp::FindOrCreateSession).await?;
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.routine_id == routine_id && s.date == date)
        {
            return Ok(existing.clone());
        }
        let session = WorkoutSession {
            id: Uuid::new_v4(),
            user_id,
            routine_id,
            date,
            completed: false,
            duration_minutes: 0,
            notes: None,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn sessions_on(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkoutSession>> {
        self.enter(StoreOp::SessionsOn).await?;
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date == date)
            .cloned()
            .collect())
    }

    async fn complete_session(&self, id: Uuid, duration_minutes: i32) -> StoreResult<WorkoutSession> {
        self.enter(StoreOp::CompleteSession).await?;
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| session_not_found(id))?;
        session.completed = true;
        session.duration_minutes = duration_minutes;
        Ok(session.clone())
    }

    async fn set_session_completed(&self, id: Uuid, completed: bool) -> StoreResult<WorkoutSession> {
        self.enter(StoreOp::SetSessionCompleted).await?;
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| session_not_found(id))?;
        session.completed = completed;
        Ok(session.clone())
    }

    async fn sessions_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<WorkoutSession>> {
        self.enter(StoreOp::SessionsBetween).await?;
        let mut sessions: Vec<WorkoutSession> = self
            .state
            .lock()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.date);
        Ok(sessions)
    }

    async fn session_counts(&self, user_id: Uuid) -> StoreResult<SessionCounts> {
        self.enter(StoreOp::SessionCounts).await?;
        let state = self.state.lock().await;
        let mine = state.sessions.iter().filter(|s| s.user_id == user_id);
        let (total, completed) = mine.fold((0, 0), |(t, c), s| (t + 1, c + s.completed as i64));
        Ok(SessionCounts { total, completed })
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        self.enter(StoreOp::Profile).await?;
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn update_stats(&self, user_id: Uuid, stats: SkillStats) -> StoreResult<Profile> {
        self.enter(StoreOp::UpdateStats).await?;
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.stats = stats;
        Ok(profile.clone())
    }

    async fn update_experience(&self, user_id: Uuid, experience: i32) -> StoreResult<Profile> {
        self.enter(StoreOp::UpdateExperience).await?;
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.experience = experience;
        let updated = profile.clone();
        state.levels.insert(user_id, level_from_experience(experience));
        Ok(updated)
    }

    async fn set_visibility(&self, user_id: Uuid, is_public: bool) -> StoreResult<Profile> {
        self.enter(StoreOp::SetVisibility).await?;
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.is_public = is_public;
        Ok(profile.clone())
    }

    async fn insert_experience(&self, entry: NewExperienceEntry) -> StoreResult<ExperienceEntry> {
        self.enter(StoreOp::InsertExperience).await?;
        let record = ExperienceEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            amount: entry.amount,
            reason: entry.reason,
            related_id: entry.related_id,
            created_at: Utc::now(),
        };
        self.state.lock().await.experience.push(record.clone());
        Ok(record)
    }

    async fn recent_experience(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<ExperienceEntry>> {
        self.enter(StoreOp::RecentExperience).await?;
        Ok(self
            .state
            .lock()
            .await
            .experience
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PlanStore for InMemoryStore {
    async fn weekly_plan(&self, user_id: Uuid) -> StoreResult<Vec<PlanEntry>> {
        self.enter(StoreOp::WeeklyPlan).await?;
        Ok(self
            .state
            .lock()
            .await
            .plans
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .map(|(&(user_id, day), &routine_id)| PlanEntry {
                user_id,
                day,
                routine_id,
            })
            .collect())
    }

    async fn plan_for_day(&self, user_id: Uuid, day: DayOfWeek) -> StoreResult<Option<PlanEntry>> {
        self.enter(StoreOp::PlanForDay).await?;
        Ok(self
            .state
            .lock()
            .await
            .plans
            .get(&(user_id, day))
            .map(|&routine_id| PlanEntry {
                user_id,
                day,
                routine_id,
            }))
    }

    async fn assign_day(
        &self,
        user_id: Uuid,
        day: DayOfWeek,
        routine_id: Uuid,
    ) -> StoreResult<PlanEntry> {
        self.enter(StoreOp::AssignDay).await?;
        self.state
            .lock()
            .await
            .plans
            .insert((user_id, day), routine_id);
        Ok(PlanEntry {
            user_id,
            day,
            routine_id,
        })
    }

    async fn clear_day(&self, user_id: Uuid, day: DayOfWeek) -> StoreResult<bool> {
        self.enter(StoreOp::ClearDay).await?;
        Ok(self
            .state
            .lock()
            .await
            .plans
            .remove(&(user_id, day))
            .is_some())
    }
}

#[async_trait]
impl ChallengeStore for InMemoryStore {
    async fn active_challenges(&self) -> StoreResult<Vec<Challenge>> {
        self.enter(StoreOp::ActiveChallenges).await?;
        Ok(self
            .state
            .lock()
            .await
            .challenges
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn challenge(&self, id: Uuid) -> StoreResult<Option<Challenge>> {
        self.enter(StoreOp::Challenge).await?;
        Ok(self
            .state
            .lock()
            .await
            .challenges
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn accept_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> StoreResult<UserChallenge> {
        self.enter(StoreOp::AcceptChallenge).await?;
        let mut state = self.state.lock().await;
        if state
            .user_challenges
            .iter()
            .any(|uc| uc.user_id == user_id && uc.challenge_id == challenge_id)
        {
            return Err(StoreError::Conflict(format!(
                "Challenge {} already accepted",
                challenge_id
            )));
        }
        let entry = UserChallenge {
            id: Uuid::new_v4(),
            user_id,
            challenge_id,
            progress: 0,
            completed: false,
            completed_at: None,
        };
        state.user_challenges.push(entry.clone());
        Ok(entry)
    }

    async fn user_challenges(&self, user_id: Uuid) -> StoreResult<Vec<AcceptedChallenge>> {
        self.enter(StoreOp::UserChallenges).await?;
        let state = self.state.lock().await;
        Ok(state
            .user_challenges
            .iter()
            .filter(|uc| uc.user_id == user_id)
            .filter_map(|uc| {
                state
                    .challenges
                    .iter()
                    .find(|c| c.id == uc.challenge_id)
                    .map(|c| AcceptedChallenge {
                        entry: uc.clone(),
                        challenge: c.clone(),
                    })
            })
            .collect())
    }

    async fn update_challenge_progress(
        &self,
        id: Uuid,
        progress: i32,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<UserChallenge> {
        self.enter(StoreOp::UpdateChallengeProgress).await?;
        let mut state = self.state.lock().await;
        let entry = state
            .user_challenges
            .iter_mut()
            .find(|uc| uc.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("User challenge {}", id)))?;
        entry.progress = progress;
        if completed_at.is_some() {
            entry.completed = true;
            entry.completed_at = entry.completed_at.or(completed_at);
        }
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(experience: i32) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: "runner".to_string(),
            full_name: "Runner".to_string(),
            is_public: false,
            stats: SkillStats::default(),
            experience,
        }
    }

    #[tokio::test]
    async fn test_find_or_create_session_is_idempotent() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let routine = Uuid::new_v4();
        let today = Utc::now().date_naive();

        let first = store.find_or_create_session(user, routine, today).await.unwrap();
        let second = store.find_or_create_session(user, routine, today).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.sessions(user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_run_out() {
        let store = InMemoryStore::new();
        store.fail_times(StoreOp::Ping, 2).await;

        assert!(store.ping().await.is_err());
        assert!(store.ping().await.is_err());
        assert!(store.ping().await.is_ok());
        assert_eq!(store.calls(StoreOp::Ping).await, 3);
    }

    #[tokio::test]
    async fn test_update_experience_writes_cached_level() {
        let store = InMemoryStore::new();
        let p = profile(40);
        let id = p.id;
        store.insert_profile(p).await;
        assert_eq!(store.cached_level(id).await, Some(Rank::E));

        let updated = store.update_experience(id, 55).await.unwrap();
        assert_eq!(updated.experience, 55);
        assert_eq!(store.cached_level(id).await, Some(Rank::D));
    }

    #[tokio::test]
    async fn test_duplicate_acceptance_conflicts() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let challenge = Uuid::new_v4();

        store.accept_challenge(user, challenge).await.unwrap();
        let err = store.accept_challenge(user, challenge).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_recent_experience_is_newest_first() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        for amount in [10, 25, 50] {
            store
                .insert_experience(NewExperienceEntry {
                    user_id: user,
                    amount,
                    reason: "workout_completed".to_string(),
                    related_id: None,
                })
                .await
                .unwrap();
        }
        let recent = store.recent_experience(user, 2).await.unwrap();
        let amounts: Vec<i32> = recent.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![50, 25]);
    }
}
