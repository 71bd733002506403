//! Workout service - one live workout engine per user
//!
//! Each user gets a [`WorkoutEngine`]: a `WorkoutMachine` behind an async
//! mutex plus the ticker that advances it while it is Running or Resting. The
//! mutex is only held for in-memory transitions, never across a store call.
//!
//! Completion is the only operation with side effects, applied in order:
//! 1. mark the session row completed with the rounded duration
//! 2. raise all five stats by the completion increase
//!
//! Step 1 is mandatory: if it still fails after retries the workout stays
//! Completed and `complete` can be called again. Step 2 is reported as
//! degraded when it fails. Completion awards no experience.
//!
//! Engines are registered by `start` and dropped again once their machine is
//! back to Idle, so reads for users without a workout leave no trace.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tracer_shared::errors::WorkoutError;
use tracer_shared::models::DayOfWeek;
use tracer_shared::types::CompletionReport;
use tracer_shared::workout::{CompletionRequest, MachineState, WorkoutMachine, WorkoutSnapshot};

use crate::config::{RestartPolicy, WorkoutConfig};
use crate::error::{ApiError, ApiResult};
use crate::repositories::Store;

use super::progression::ProgressionService;
use super::retry::RetryPolicy;
use super::ticker::{Tick, Ticker};

/// Degraded step name reported in [`CompletionReport::degraded`]
pub const STEP_STATS: &str = "stats";

struct EngineInner {
    machine: WorkoutMachine,
    ticker: Option<Ticker>,
    completing: bool,
}

impl Tick for EngineInner {
    fn tick(&mut self) -> bool {
        self.machine.tick();
        self.machine.is_ticking()
    }
}

/// Live workout of a single user
#[derive(Clone)]
pub struct WorkoutEngine {
    inner: Arc<Mutex<EngineInner>>,
    tick_interval: Duration,
}

/// Exclusive access to an engine's state
pub struct EngineGuard<'a> {
    inner: MutexGuard<'a, EngineInner>,
    engine: &'a WorkoutEngine,
}

impl EngineGuard<'_> {
    pub fn machine(&self) -> &WorkoutMachine {
        &self.inner.machine
    }

    pub fn machine_mut(&mut self) -> &mut WorkoutMachine {
        &mut self.inner.machine
    }

    /// Start or stop the ticker to match the machine state
    pub fn sync_ticker(&mut self) {
        if self.inner.machine.is_ticking() {
            let running = self.inner.ticker.as_ref().is_some_and(Ticker::is_running);
            if !running {
                self.inner.ticker = Some(Ticker::spawn(
                    Arc::downgrade(&self.engine.inner),
                    self.engine.tick_interval,
                ));
            }
        } else {
            self.inner.ticker = None;
        }
    }

    pub fn ticker_running(&self) -> bool {
        self.inner.ticker.as_ref().is_some_and(Ticker::is_running)
    }
}

impl WorkoutEngine {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                machine: WorkoutMachine::new(),
                ticker: None,
                completing: false,
            })),
            tick_interval,
        }
    }

    pub async fn lock(&self) -> EngineGuard<'_> {
        EngineGuard {
            inner: self.inner.lock().await,
            engine: self,
        }
    }

    pub async fn snapshot(&self) -> WorkoutSnapshot {
        self.inner.lock().await.machine.snapshot()
    }

    /// Apply a transition, resync the ticker and return the new view
    pub async fn apply<T>(
        &self,
        op: impl FnOnce(&mut WorkoutMachine) -> Result<T, WorkoutError>,
    ) -> Result<WorkoutSnapshot, WorkoutError> {
        let mut guard = self.lock().await;
        op(guard.machine_mut())?;
        guard.sync_ticker();
        Ok(guard.machine().snapshot())
    }

    /// Stop the ticker without touching the machine
    pub async fn halt(&self) {
        self.inner.lock().await.ticker = None;
    }
}

/// Registry of workout engines, one per user
#[derive(Clone)]
pub struct WorkoutService {
    store: Arc<dyn Store>,
    settings: WorkoutConfig,
    retry: RetryPolicy,
    engines: Arc<RwLock<HashMap<Uuid, WorkoutEngine>>>,
}

impl WorkoutService {
    pub fn new(store: Arc<dyn Store>, settings: WorkoutConfig) -> Self {
        Self {
            retry: RetryPolicy::from_config(&settings),
            store,
            settings,
            engines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Engine for `user_id`, created on first use
    pub async fn engine(&self, user_id: Uuid) -> WorkoutEngine {
        if let Some(engine) = self.lookup(user_id).await {
            return engine;
        }
        self.engines
            .write()
            .await
            .entry(user_id)
            .or_insert_with(|| WorkoutEngine::new(self.settings.tick_interval()))
            .clone()
    }

    /// Registered engine for `user_id`, if any
    pub async fn lookup(&self, user_id: Uuid) -> Option<WorkoutEngine> {
        self.engines.read().await.get(&user_id).cloned()
    }

    async fn active_engine(&self, user_id: Uuid) -> ApiResult<WorkoutEngine> {
        self.lookup(user_id)
            .await
            .ok_or_else(|| WorkoutError::NoActiveWorkout.into())
    }

    /// Number of registered engines
    pub async fn engine_count(&self) -> usize {
        self.engines.read().await.len()
    }

    /// Unregister `engine` if its machine is Idle and nobody else holds it.
    ///
    /// Clones are only handed out under the registry lock, so the strong
    /// count cannot grow while the write lock is held.
    async fn release(&self, user_id: Uuid, engine: &WorkoutEngine) {
        let mut engines = self.engines.write().await;
        let Some(registered) = engines.get(&user_id) else {
            return;
        };
        if !Arc::ptr_eq(&registered.inner, &engine.inner) || Arc::strong_count(&engine.inner) > 2 {
            return;
        }
        let idle = match engine.inner.try_lock() {
            Ok(inner) => inner.machine.state() == MachineState::Idle && !inner.completing,
            Err(_) => false,
        };
        if idle {
            engines.remove(&user_id);
            debug!(%user_id, "Workout engine released");
        }
    }

    pub async fn snapshot(&self, user_id: Uuid) -> WorkoutSnapshot {
        match self.lookup(user_id).await {
            Some(engine) => engine.snapshot().await,
            None => WorkoutMachine::new().snapshot(),
        }
    }

    /// Start a workout for `routine_id`.
    ///
    /// The session row for today is created up front when the store allows;
    /// otherwise completion creates it later.
    #[instrument(skip(self))]
    pub async fn start(&self, user_id: Uuid, routine_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        self.check_restart(user_id).await?;

        let store = self.store.as_ref();
        let routine = self
            .retry
            .run("routine", || store.routine(routine_id))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Routine {} not found", routine_id)))?;
        let exercises = self
            .retry
            .run("routine_exercises", || store.routine_exercises(routine_id))
            .await?;

        let today = Utc::now().date_naive();
        let session_id = match store.find_or_create_session(user_id, routine_id, today).await {
            Ok(session) => Some(session.id),
            Err(err) => {
                warn!(%user_id, %routine_id, error = %err, "Session row not created at start");
                None
            }
        };

        if exercises.is_empty() {
            debug!(%routine_id, "Starting a routine without exercises");
        }

        let engine = self.engine(user_id).await;
        let mut guard = engine.lock().await;
        if self.settings.restart_policy == RestartPolicy::Reject {
            if let Some(active) = guard.machine().active() {
                return Err(WorkoutError::AlreadyActive(active.routine().id).into());
            }
        }
        let exercise_count = exercises.len();
        if let Some(discarded) = guard.machine_mut().start(routine, exercises, Utc::now()) {
            info!(
                %user_id,
                discarded_routine = %discarded.routine().id,
                "Replaced active workout"
            );
            metrics::counter!("tracer_workouts_cancelled_total").increment(1);
        }
        if let Some(id) = session_id {
            guard.machine_mut().attach_session(id)?;
        }
        guard.sync_ticker();

        metrics::counter!("tracer_workouts_started_total").increment(1);
        info!(%user_id, %routine_id, exercises = exercise_count, "Workout started");
        Ok(guard.machine().snapshot())
    }

    /// Start the routine planned for today's weekday
    pub async fn start_today(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        let day = DayOfWeek::of(Utc::now().date_naive());
        let store = self.store.as_ref();
        let entry = self
            .retry
            .run("plan_for_day", || store.plan_for_day(user_id, day))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No routine planned for {}", day)))?;

        self.start(user_id, entry.routine_id).await
    }

    async fn check_restart(&self, user_id: Uuid) -> ApiResult<()> {
        if self.settings.restart_policy != RestartPolicy::Reject {
            return Ok(());
        }
        if let Some(engine) = self.lookup(user_id).await {
            let guard = engine.lock().await;
            if let Some(active) = guard.machine().active() {
                return Err(WorkoutError::AlreadyActive(active.routine().id).into());
            }
        }
        Ok(())
    }

    pub async fn pause(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        Ok(self.active_engine(user_id).await?.apply(WorkoutMachine::pause).await?)
    }

    pub async fn resume(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        Ok(self.active_engine(user_id).await?.apply(WorkoutMachine::resume).await?)
    }

    pub async fn toggle_pause(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        Ok(self
            .active_engine(user_id)
            .await?
            .apply(WorkoutMachine::toggle_pause)
            .await?)
    }

    pub async fn next_exercise(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        Ok(self
            .active_engine(user_id)
            .await?
            .apply(WorkoutMachine::next_exercise)
            .await?)
    }

    pub async fn previous_exercise(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        Ok(self
            .active_engine(user_id)
            .await?
            .apply(WorkoutMachine::previous_exercise)
            .await?)
    }

    /// Rest for `seconds`, or for the current exercise's rest when `None`
    pub async fn start_rest(&self, user_id: Uuid, seconds: Option<i32>) -> ApiResult<WorkoutSnapshot> {
        let engine = self.active_engine(user_id).await?;
        let snapshot = match seconds {
            Some(seconds) => engine.apply(|m| m.start_rest(seconds)).await?,
            None => engine.apply(WorkoutMachine::start_rest_for_current).await?,
        };
        Ok(snapshot)
    }

    pub async fn toggle_exercise(&self, user_id: Uuid, exercise_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        Ok(self
            .active_engine(user_id)
            .await?
            .apply(|m| m.toggle_exercise_completion(exercise_id))
            .await?)
    }

    /// Abandon the workout. Any session row already created stays uncompleted.
    #[instrument(skip(self))]
    pub async fn end(&self, user_id: Uuid) -> ApiResult<WorkoutSnapshot> {
        let Some(engine) = self.lookup(user_id).await else {
            return Ok(WorkoutMachine::new().snapshot());
        };
        let mut guard = engine.lock().await;
        if let Some(discarded) = guard.machine_mut().end() {
            metrics::counter!("tracer_workouts_cancelled_total").increment(1);
            info!(
                %user_id,
                routine_id = %discarded.routine().id,
                elapsed_seconds = discarded.elapsed_seconds(),
                "Workout ended without completion"
            );
        }
        guard.sync_ticker();
        let snapshot = guard.machine().snapshot();
        drop(guard);

        self.release(user_id, &engine).await;
        Ok(snapshot)
    }

    /// Finish the workout and apply its rewards
    #[instrument(skip(self))]
    pub async fn complete(&self, user_id: Uuid) -> ApiResult<CompletionReport> {
        let engine = self.active_engine(user_id).await?;

        let request = {
            let mut guard = engine.lock().await;
            if guard.inner.completing {
                return Err(ApiError::Conflict(
                    "Workout completion already in progress".to_string(),
                ));
            }
            let request = guard.machine_mut().begin_completion()?;
            guard.inner.completing = true;
            guard.sync_ticker();
            request
        };

        let result = self.persist_completion(user_id, &engine, &request).await;

        let mut guard = engine.lock().await;
        guard.inner.completing = false;
        let report = result?;
        if let Err(err) = guard.machine_mut().finish_completion() {
            // The workout was ended or replaced while rewards were being saved.
            debug!(%user_id, error = %err, "Machine moved on during completion");
        }
        guard.sync_ticker();
        drop(guard);
        self.release(user_id, &engine).await;

        metrics::counter!("tracer_workouts_completed_total").increment(1);
        if report.is_degraded() {
            metrics::counter!("tracer_completions_degraded_total").increment(1);
        }
        info!(
            %user_id,
            session_id = %report.session.id,
            duration_minutes = report.session.duration_minutes,
            stat_increase = report.stat_increase,
            degraded = ?report.degraded,
            "Workout completed"
        );
        Ok(report)
    }

    async fn persist_completion(
        &self,
        user_id: Uuid,
        engine: &WorkoutEngine,
        request: &CompletionRequest,
    ) -> ApiResult<CompletionReport> {
        let store = self.store.as_ref();
        let retry = &self.retry;

        let session_id = match request.session_id {
            Some(id) => id,
            None => {
                let session = retry
                    .run("find_or_create_session", || {
                        store.find_or_create_session(user_id, request.routine_id, request.started_on)
                    })
                    .await?;
                let mut guard = engine.lock().await;
                if guard.machine().state() == MachineState::Completed {
                    guard.machine_mut().attach_session(session.id)?;
                }
                session.id
            }
        };

        let session = retry
            .run("complete_session", || {
                store.complete_session(session_id, request.duration_minutes)
            })
            .await?;

        let mut degraded = Vec::new();

        let stats = match ProgressionService::apply_stat_increase(
            store,
            retry,
            user_id,
            request.stat_increase,
        )
        .await
        {
            Ok(profile) => Some(profile.stats),
            Err(err) => {
                warn!(%user_id, error = %err, "Stat increase not applied");
                degraded.push(STEP_STATS.to_string());
                None
            }
        };

        Ok(CompletionReport {
            session,
            completed_exercises: request.completed_exercises,
            total_exercises: request.total_exercises,
            stat_increase: request.stat_increase,
            stats,
            degraded,
        })
    }

    /// Stop every ticker. Workouts stay in memory until the process exits.
    pub async fn shutdown(&self) {
        let engines: Vec<WorkoutEngine> = self.engines.read().await.values().cloned().collect();
        for engine in &engines {
            engine.halt().await;
        }
        info!(engines = engines.len(), "Workout timers stopped");
    }
}
