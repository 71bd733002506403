//! Progression rules: ranks, stat rewards and experience awards
//!
//! Everything here is a pure function of its inputs so the same rules run in
//! the backend and, through the WASM crate, in the browser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::Difficulty;

/// Highest value a skill stat can reach
pub const MAX_STAT: i32 = 100;

/// Largest stat bump a single completed workout can grant
pub const MAX_STAT_INCREASE: i32 = 2;

/// Experience granted when a workout is marked completed
pub const WORKOUT_COMPLETED_XP: i32 = 10;

/// Experience history reason tags
pub const REASON_WORKOUT_COMPLETED: &str = "workout_completed";
pub const REASON_CHALLENGE_COMPLETED: &str = "challenge_completed";

/// Letter rank, lowest (E) to highest (S)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    E,
    D,
    C,
    B,
    A,
    S,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::E => "E",
            Rank::D => "D",
            Rank::C => "C",
            Rank::B => "B",
            Rank::A => "A",
            Rank::S => "S",
        }
    }

    /// Minimum experience required to hold this rank
    pub fn threshold(&self) -> i32 {
        RANK_THRESHOLDS
            .iter()
            .find(|(_, rank)| rank == self)
            .map(|(min, _)| *min)
            .unwrap_or(0)
    }

    /// Next rank up, `None` at S
    pub fn next(&self) -> Option<Rank> {
        match self {
            Rank::E => Some(Rank::D),
            Rank::D => Some(Rank::C),
            Rank::C => Some(Rank::B),
            Rank::B => Some(Rank::A),
            Rank::A => Some(Rank::S),
            Rank::S => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "E" => Ok(Rank::E),
            "D" => Ok(Rank::D),
            "C" => Ok(Rank::C),
            "B" => Ok(Rank::B),
            "A" => Ok(Rank::A),
            "S" => Ok(Rank::S),
            _ => Err(format!("Unknown rank: {}", s)),
        }
    }
}

/// Experience thresholds, highest first
pub const RANK_THRESHOLDS: [(i32, Rank); 6] = [
    (1600, Rank::S),
    (800, Rank::A),
    (400, Rank::B),
    (200, Rank::C),
    (50, Rank::D),
    (0, Rank::E),
];

/// Rank for an experience total.
///
/// Total over all of `i32`: negative experience cannot occur through the award
/// path, and maps to E if it ever shows up in stored data.
pub fn level_from_experience(experience: i32) -> Rank {
    RANK_THRESHOLDS
        .iter()
        .find(|(min, _)| experience >= *min)
        .map(|(_, rank)| *rank)
        .unwrap_or(Rank::E)
}

/// Experience still missing to reach the next rank, `None` at S
pub fn experience_to_next_rank(experience: i32) -> Option<i32> {
    level_from_experience(experience)
        .next()
        .map(|next| (next.threshold() - experience.max(0)).max(0))
}

/// Letter grade for a single skill stat
pub fn stat_rank(value: i32) -> Rank {
    match value {
        v if v >= 90 => Rank::S,
        v if v >= 80 => Rank::A,
        v if v >= 70 => Rank::B,
        v if v >= 60 => Rank::C,
        v if v >= 50 => Rank::D,
        _ => Rank::E,
    }
}

/// Clamp a stat into [0, 100]
#[inline]
pub fn clamp_stat(value: i32) -> i32 {
    value.clamp(0, MAX_STAT)
}

/// Stat bump for a finished workout: `min(2, floor(completed / total * 3))`.
///
/// An empty routine grants nothing.
pub fn stat_increase(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let scaled = (completed * 3) / total;
    (scaled as i32).min(MAX_STAT_INCREASE)
}

/// Experience reward for completing a challenge of the given difficulty
pub fn challenge_reward(difficulty: Difficulty) -> i32 {
    match difficulty {
        Difficulty::Beginner => 25,
        Difficulty::Intermediate => 50,
        Difficulty::Advanced => 100,
    }
}

/// What evaluating a challenge against current stats should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Already completed, or progress did not move
    Unchanged,
    /// Progress moved but the target is not reached
    Progressed(i32),
    /// Target reached; carries the final progress value
    Completed(i32),
}

/// Decide the outcome of a challenge given the user's current stat value
pub fn evaluate_challenge(
    already_completed: bool,
    recorded_progress: i32,
    target_value: i32,
    current_value: i32,
) -> ChallengeOutcome {
    if already_completed {
        ChallengeOutcome::Unchanged
    } else if current_value >= target_value {
        ChallengeOutcome::Completed(current_value)
    } else if current_value != recorded_progress {
        ChallengeOutcome::Progressed(current_value)
    } else {
        ChallengeOutcome::Unchanged
    }
}
