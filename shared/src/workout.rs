//! Active workout state machine
//!
//! `WorkoutMachine` owns the ephemeral state of the single workout a user is
//! performing: which exercise is current, the elapsed and rest timers, the
//! pause flag and the set of exercises marked done. It is purely synchronous;
//! time advances only through [`WorkoutMachine::tick`], which the caller drives
//! once per second.
//!
//! ```text
//!            start                 start_rest(s > 0)
//!   Idle ───────────► Running ─────────────────────► Resting
//!    ▲                 │  ▲  ◄──── rest reaches 0 ────   │
//!    │            pause│  │resume                        │pause
//!    │                 ▼  │                              ▼
//!    │                Paused (remembers Running/Resting)
//!    │                          │ complete (from any active state)
//!    └──── finish / end ◄── Completed
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::errors::WorkoutError;
use crate::models::{Routine, RoutineExercise};
use crate::progression::stat_increase;

/// Externally visible machine state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Idle,
    Running,
    Resting,
    Paused,
    Completed,
}

impl MachineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Resting => "resting",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Resting,
    Paused { resting: bool },
    Completed,
}

impl Phase {
    fn state(self) -> MachineState {
        match self {
            Phase::Running => MachineState::Running,
            Phase::Resting => MachineState::Resting,
            Phase::Paused { .. } => MachineState::Paused,
            Phase::Completed => MachineState::Completed,
        }
    }
}

/// In-memory state of the workout being performed
#[derive(Debug, Clone)]
pub struct ActiveWorkout {
    routine: Routine,
    exercises: Vec<RoutineExercise>,
    session_id: Option<Uuid>,
    started_at: DateTime<Utc>,
    current_index: usize,
    phase: Phase,
    completed: BTreeSet<Uuid>,
    elapsed_seconds: u32,
    exercise_seconds: u32,
    rest_remaining: u32,
}

impl ActiveWorkout {
    fn new(routine: Routine, mut exercises: Vec<RoutineExercise>, started_at: DateTime<Utc>) -> Self {
        // Stable, so duplicate order indexes keep their load order.
        exercises.sort_by_key(|e| e.order_index);
        Self {
            routine,
            exercises,
            session_id: None,
            started_at,
            current_index: 0,
            phase: Phase::Running,
            completed: BTreeSet::new(),
            elapsed_seconds: 0,
            exercise_seconds: 0,
            rest_remaining: 0,
        }
    }

    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn exercises(&self) -> &[RoutineExercise] {
        &self.exercises
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_exercise(&self) -> Option<&RoutineExercise> {
        self.exercises.get(self.current_index)
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn exercise_seconds(&self) -> u32 {
        self.exercise_seconds
    }

    pub fn rest_remaining(&self) -> u32 {
        self.rest_remaining
    }

    pub fn is_completed(&self, exercise_id: Uuid) -> bool {
        self.completed.contains(&exercise_id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Fraction of exercises marked done, as a percentage
    pub fn progress_percent(&self) -> f64 {
        if self.exercises.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.exercises.len() as f64 * 100.0
    }

    fn state(&self) -> MachineState {
        self.phase.state()
    }

    fn reset_exercise_timers(&mut self) {
        self.exercise_seconds = 0;
        self.rest_remaining = 0;
        self.phase = match self.phase {
            Phase::Resting => Phase::Running,
            Phase::Paused { .. } => Phase::Paused { resting: false },
            other => other,
        };
    }
}

/// Values needed to persist a finished workout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub routine_id: Uuid,
    pub session_id: Option<Uuid>,
    /// Calendar day the workout was started, used to key the session row
    pub started_on: NaiveDate,
    pub elapsed_seconds: u32,
    pub duration_minutes: i32,
    pub completed_exercises: usize,
    pub total_exercises: usize,
    pub stat_increase: i32,
}

/// Serializable view of the machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSnapshot {
    pub state: MachineState,
    pub routine: Option<Routine>,
    pub exercises: Vec<RoutineExercise>,
    pub current_index: usize,
    pub current_exercise: Option<RoutineExercise>,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u32,
    pub exercise_seconds: u32,
    pub rest_remaining: u32,
    pub completed_exercise_ids: Vec<Uuid>,
    pub progress_percent: f64,
    pub elapsed_clock: String,
    pub rest_clock: String,
}

/// Round elapsed seconds to whole minutes, halves rounding up
pub fn duration_minutes(elapsed_seconds: u32) -> i32 {
    ((elapsed_seconds as u64 + 30) / 60) as i32
}

/// Format seconds as `mm:ss`
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// State machine for a single active workout
#[derive(Debug, Clone, Default)]
pub struct WorkoutMachine {
    active: Option<ActiveWorkout>,
}

impl WorkoutMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MachineState {
        self.active
            .as_ref()
            .map(ActiveWorkout::state)
            .unwrap_or(MachineState::Idle)
    }

    pub fn active(&self) -> Option<&ActiveWorkout> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the one-second tick should be running
    pub fn is_ticking(&self) -> bool {
        matches!(self.state(), MachineState::Running | MachineState::Resting)
    }

    /// Start a workout. Any workout already held is discarded and returned.
    pub fn start(
        &mut self,
        routine: Routine,
        exercises: Vec<RoutineExercise>,
        started_at: DateTime<Utc>,
    ) -> Option<ActiveWorkout> {
        self.active
            .replace(ActiveWorkout::new(routine, exercises, started_at))
    }

    /// Link the persisted session row once it exists
    pub fn attach_session(&mut self, session_id: Uuid) -> Result<(), WorkoutError> {
        let active = self.active_mut()?;
        active.session_id = Some(session_id);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<MachineState, WorkoutError> {
        let active = self.active_mut()?;
        active.phase = match active.phase {
            Phase::Running => Phase::Paused { resting: false },
            Phase::Resting => Phase::Paused { resting: true },
            paused @ Phase::Paused { .. } => paused,
            Phase::Completed => {
                return Err(WorkoutError::InvalidTransition {
                    action: "pause",
                    state: MachineState::Completed,
                })
            }
        };
        Ok(active.state())
    }

    pub fn resume(&mut self) -> Result<MachineState, WorkoutError> {
        let active = self.active_mut()?;
        active.phase = match active.phase {
            Phase::Paused { resting: true } => Phase::Resting,
            Phase::Paused { resting: false } => Phase::Running,
            Phase::Completed => {
                return Err(WorkoutError::InvalidTransition {
                    action: "resume",
                    state: MachineState::Completed,
                })
            }
            running => running,
        };
        Ok(active.state())
    }

    pub fn toggle_pause(&mut self) -> Result<MachineState, WorkoutError> {
        if self.state() == MachineState::Paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Move to the next exercise. Returns `false` (and changes nothing) at the
    /// last exercise or when the routine is empty.
    pub fn next_exercise(&mut self) -> Result<bool, WorkoutError> {
        let active = self.navigable_mut("move to the next exercise")?;
        if active.current_index + 1 >= active.exercises.len() {
            return Ok(false);
        }
        active.current_index += 1;
        active.reset_exercise_timers();
        Ok(true)
    }

    /// Move to the previous exercise. Returns `false` at index 0.
    pub fn previous_exercise(&mut self) -> Result<bool, WorkoutError> {
        let active = self.navigable_mut("move to the previous exercise")?;
        if active.current_index == 0 {
            return Ok(false);
        }
        active.current_index -= 1;
        active.reset_exercise_timers();
        Ok(true)
    }

    /// Begin a rest countdown. A non-positive length never enters Resting.
    pub fn start_rest(&mut self, seconds: i32) -> Result<bool, WorkoutError> {
        let active = self.active_mut()?;
        match active.phase {
            Phase::Running | Phase::Resting => {}
            phase => {
                return Err(WorkoutError::InvalidTransition {
                    action: "start a rest",
                    state: phase.state(),
                })
            }
        }
        if seconds <= 0 {
            return Ok(false);
        }
        active.rest_remaining = seconds as u32;
        active.exercise_seconds = 0;
        active.phase = Phase::Resting;
        Ok(true)
    }

    /// Rest for the current exercise's configured `rest_seconds`
    pub fn start_rest_for_current(&mut self) -> Result<bool, WorkoutError> {
        let seconds = self
            .active
            .as_ref()
            .ok_or(WorkoutError::NoActiveWorkout)?
            .current_exercise()
            .map(|e| e.rest_seconds)
            .unwrap_or(0);
        self.start_rest(seconds)
    }

    /// Advance the timers by one second. Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        match active.phase {
            Phase::Running => {
                active.elapsed_seconds = active.elapsed_seconds.saturating_add(1);
                active.exercise_seconds = active.exercise_seconds.saturating_add(1);
                true
            }
            Phase::Resting => {
                active.elapsed_seconds = active.elapsed_seconds.saturating_add(1);
                active.rest_remaining = active.rest_remaining.saturating_sub(1);
                if active.rest_remaining == 0 {
                    active.phase = Phase::Running;
                }
                true
            }
            Phase::Paused { .. } | Phase::Completed => false,
        }
    }

    /// Flip the done mark of an exercise. Returns the new membership.
    pub fn toggle_exercise_completion(&mut self, exercise_id: Uuid) -> Result<bool, WorkoutError> {
        let active = self.navigable_mut("mark exercises")?;
        if !active.exercises.iter().any(|e| e.id == exercise_id) {
            return Err(WorkoutError::UnknownExercise(exercise_id));
        }
        if active.completed.remove(&exercise_id) {
            Ok(false)
        } else {
            active.completed.insert(exercise_id);
            Ok(true)
        }
    }

    /// Discard the workout from any state. Idle stays Idle.
    pub fn end(&mut self) -> Option<ActiveWorkout> {
        self.active.take()
    }

    /// Freeze the workout in Completed and return what must be persisted.
    ///
    /// Calling it again while Completed returns the same request, so a failed
    /// persistence step can be retried without losing the elapsed time.
    pub fn begin_completion(&mut self) -> Result<CompletionRequest, WorkoutError> {
        let active = self.active_mut()?;
        active.phase = Phase::Completed;
        active.rest_remaining = 0;
        Ok(CompletionRequest {
            routine_id: active.routine.id,
            session_id: active.session_id,
            started_on: active.started_at.date_naive(),
            elapsed_seconds: active.elapsed_seconds,
            duration_minutes: duration_minutes(active.elapsed_seconds),
            completed_exercises: active.completed.len(),
            total_exercises: active.exercises.len(),
            stat_increase: stat_increase(active.completed.len(), active.exercises.len()),
        })
    }

    /// Leave Completed for Idle once persistence is done
    pub fn finish_completion(&mut self) -> Result<ActiveWorkout, WorkoutError> {
        match self.state() {
            MachineState::Completed => self.active.take().ok_or(WorkoutError::NoActiveWorkout),
            MachineState::Idle => Err(WorkoutError::NoActiveWorkout),
            state => Err(WorkoutError::InvalidTransition {
                action: "finish",
                state,
            }),
        }
    }

    pub fn snapshot(&self) -> WorkoutSnapshot {
        match &self.active {
            None => WorkoutSnapshot {
                state: MachineState::Idle,
                routine: None,
                exercises: Vec::new(),
                current_index: 0,
                current_exercise: None,
                session_id: None,
                started_at: None,
                elapsed_seconds: 0,
                exercise_seconds: 0,
                rest_remaining: 0,
                completed_exercise_ids: Vec::new(),
                progress_percent: 0.0,
                elapsed_clock: format_clock(0),
                rest_clock: format_clock(0),
            },
            Some(active) => WorkoutSnapshot {
                state: active.state(),
                routine: Some(active.routine.clone()),
                exercises: active.exercises.clone(),
                current_index: active.current_index,
                current_exercise: active.current_exercise().cloned(),
                session_id: active.session_id,
                started_at: Some(active.started_at),
                elapsed_seconds: active.elapsed_seconds,
                exercise_seconds: active.exercise_seconds,
                rest_remaining: active.rest_remaining,
                completed_exercise_ids: active.completed.iter().copied().collect(),
                progress_percent: active.progress_percent(),
                elapsed_clock: format_clock(active.elapsed_seconds),
                rest_clock: format_clock(active.rest_remaining),
            },
        }
    }

    fn active_mut(&mut self) -> Result<&mut ActiveWorkout, WorkoutError> {
        self.active.as_mut().ok_or(WorkoutError::NoActiveWorkout)
    }

    fn navigable_mut(&mut self, action: &'static str) -> Result<&mut ActiveWorkout, WorkoutError> {
        let active = self.active_mut()?;
        if active.phase == Phase::Completed {
            return Err(WorkoutError::InvalidTransition {
                action,
                state: MachineState::Completed,
            });
        }
        Ok(active)
    }
}
