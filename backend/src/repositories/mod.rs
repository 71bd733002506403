//! Database repositories
//!
//! Provides the data access layer. Each repository is a set of queries over a
//! `PgPool`; [`PgStore`] exposes them through the [`Store`] traits that the
//! services consume.

pub mod challenge;
pub mod memory;
pub mod plan;
pub mod profile;
pub mod routine;
pub mod session;
pub mod store;

pub use challenge::ChallengeRepository;
pub use memory::{InMemoryStore, StoreOp};
pub use plan::PlanRepository;
pub use profile::ProfileRepository;
pub use routine::RoutineRepository;
pub use session::SessionRepository;
pub use store::{
    ChallengeStore, PgStore, PlanStore, ProfileStore, SessionStore, Store, StoreError, StoreResult,
};
