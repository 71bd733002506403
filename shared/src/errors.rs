//! Error types for the Tracer domain

use thiserror::Error;
use uuid::Uuid;

use crate::workout::MachineState;

/// Illegal operations against the workout state machine.
///
/// These are local state errors: they point at a caller bug and are never
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkoutError {
    #[error("No active workout")]
    NoActiveWorkout,

    #[error("A workout is already active for routine {0}")]
    AlreadyActive(Uuid),

    #[error("Cannot {action} while the workout is {state}")]
    InvalidTransition {
        action: &'static str,
        state: MachineState,
    },

    #[error("Exercise {0} is not part of the active workout")]
    UnknownExercise(Uuid),
}

/// Domain validation error with field context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
