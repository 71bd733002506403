//! Tracer WASM Module
//!
//! Browser bindings for the progression rules, so the client can preview
//! ranks and rewards with the same numbers the backend uses.

use tracer_shared::progression;
use tracer_shared::workout;
use wasm_bindgen::prelude::*;

/// Rank letter ("E" to "S") for an experience total
#[wasm_bindgen]
pub fn level_from_experience(experience: i32) -> String {
    progression::level_from_experience(experience).to_string()
}

/// Experience missing for the next rank, `undefined` at S
#[wasm_bindgen]
pub fn experience_to_next_rank(experience: i32) -> Option<i32> {
    progression::experience_to_next_rank(experience)
}

/// Rank letter for a single skill stat
#[wasm_bindgen]
pub fn stat_rank(value: i32) -> String {
    progression::stat_rank(value).to_string()
}

/// Stat bump a workout would grant with `completed` of `total` exercises done
#[wasm_bindgen]
pub fn stat_increase(completed: usize, total: usize) -> i32 {
    progression::stat_increase(completed, total)
}

/// Workout duration in whole minutes as it will be saved
#[wasm_bindgen]
pub fn duration_minutes(elapsed_seconds: u32) -> i32 {
    workout::duration_minutes(elapsed_seconds)
}

/// `mm:ss` clock text
#[wasm_bindgen]
pub fn format_clock(seconds: u32) -> String {
    workout::format_clock(seconds)
}
