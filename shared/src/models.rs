//! Data models for the Tracer application

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::progression::{clamp_stat, level_from_experience, Rank};

/// Routine and challenge difficulty
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(format!("Unknown difficulty: {}", s)),
        }
    }
}

/// Workout routine template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Routine {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub duration_minutes: i32,
    pub is_public: bool,
    pub is_default: bool,
    pub creator_id: Option<Uuid>,
}

/// Exercise attached to a routine
///
/// `reps` is free text ("10", "8-12", "al fallo") and is never parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineExercise {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sets: i32,
    pub reps: String,
    pub rest_seconds: i32,
    pub order_index: i32,
}

/// Persisted record of one attempt at a routine on a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub routine_id: Uuid,
    pub date: NaiveDate,
    pub completed: bool,
    pub duration_minutes: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Session totals for a user
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCounts {
    pub total: i64,
    pub completed: i64,
}

impl SessionCounts {
    /// Completion rate as a whole percentage (0 when there are no sessions)
    pub fn completion_rate(&self) -> i64 {
        if self.total <= 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as i64
    }
}

/// The five skill stats tracked per profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Fuerza,
    Resistencia,
    Tecnica,
    Definicion,
    Constancia,
}

impl StatKind {
    pub const ALL: [StatKind; 5] = [
        StatKind::Fuerza,
        StatKind::Resistencia,
        StatKind::Tecnica,
        StatKind::Definicion,
        StatKind::Constancia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fuerza => "fuerza",
            Self::Resistencia => "resistencia",
            Self::Tecnica => "tecnica",
            Self::Definicion => "definicion",
            Self::Constancia => "constancia",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown stat: {}", s))
    }
}

/// Skill stats, each kept in [0, 100]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillStats {
    pub fuerza: i32,
    pub resistencia: i32,
    pub tecnica: i32,
    pub definicion: i32,
    pub constancia: i32,
}

impl SkillStats {
    pub fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Fuerza => self.fuerza,
            StatKind::Resistencia => self.resistencia,
            StatKind::Tecnica => self.tecnica,
            StatKind::Definicion => self.definicion,
            StatKind::Constancia => self.constancia,
        }
    }

    /// Add `delta` to every stat, clamping each to [0, 100]
    pub fn with_increase(&self, delta: i32) -> SkillStats {
        SkillStats {
            fuerza: clamp_stat(self.fuerza + delta),
            resistencia: clamp_stat(self.resistencia + delta),
            tecnica: clamp_stat(self.tecnica + delta),
            definicion: clamp_stat(self.definicion + delta),
            constancia: clamp_stat(self.constancia + delta),
        }
    }

    /// Rounded mean of the five stats
    pub fn average(&self) -> i32 {
        let sum: i32 = StatKind::ALL.iter().map(|k| self.get(*k)).sum();
        (sum as f64 / StatKind::ALL.len() as f64).round() as i32
    }
}

/// User profile, restricted to the fields progression cares about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub is_public: bool,
    pub stats: SkillStats,
    pub experience: i32,
}

impl Profile {
    /// Rank derived from experience; there is no separate level field to drift.
    #[inline]
    pub fn level(&self) -> Rank {
        level_from_experience(self.experience)
    }
}

/// Experience history record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperienceEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub reason: String,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an experience history record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExperienceEntry {
    pub user_id: Uuid,
    pub amount: i32,
    pub reason: String,
    pub related_id: Option<Uuid>,
}

/// Day of the week used by the weekly planner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Days since Monday (Monday = 0)
    pub fn offset(&self) -> u32 {
        Weekday::from(*self).num_days_from_monday()
    }

    pub fn of(date: NaiveDate) -> DayOfWeek {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown day of week: {}", s))
    }
}

/// Routine assigned to a weekday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    pub user_id: Uuid,
    pub day: DayOfWeek,
    pub routine_id: Uuid,
}

/// Gamified challenge definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub target_value: i32,
    pub stat_type: StatKind,
    pub is_active: bool,
}

/// A user's acceptance of a challenge and its progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserChallenge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub progress: i32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// User challenge joined with its definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcceptedChallenge {
    pub entry: UserChallenge,
    pub challenge: Challenge,
}
