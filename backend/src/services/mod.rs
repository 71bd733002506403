//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! the store and the workout engines.

pub mod challenges;
pub mod planner;
pub mod profile;
pub mod progression;
pub mod retry;
pub mod ticker;
pub mod workout;

pub use challenges::ChallengeService;
pub use planner::PlannerService;
pub use profile::ProfileService;
pub use progression::{ExperienceAward, ProgressionService};
pub use retry::RetryPolicy;
pub use workout::{WorkoutEngine, WorkoutService};
