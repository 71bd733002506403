//! Tracer Shared Library
//!
//! Domain types and pure rules shared by the backend and the WASM module:
//! the workout state machine, progression rules, weekly planner statuses and
//! the API request/response types.

pub mod errors;
pub mod models;
pub mod planner;
pub mod progression;
pub mod types;
pub mod validation;
pub mod workout;

// Re-export commonly used items
pub use errors::*;
pub use models::*;
pub use planner::{DayOverview, DayStatus};
pub use progression::{ChallengeOutcome, Rank};
pub use types::*;
pub use workout::{MachineState, WorkoutMachine, WorkoutSnapshot};
