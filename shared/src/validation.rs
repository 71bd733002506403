//! Input validation functions
//!
//! Plain validators for domain values. Request bodies additionally use the
//! `validator` crate derive macros (see `types`).

use std::sync::OnceLock;

use crate::errors::FieldError;
use crate::progression::MAX_STAT;

/// Longest rest a single exercise may prescribe, in seconds
pub const MAX_REST_SECONDS: i32 = 3600;

fn reason_regex() -> &'static regex_lite::Regex {
    static RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex_lite::Regex::new(r"^[a-z][a-z0-9_]*$").expect("reason pattern is valid")
    })
}

/// Validate an experience reason tag (lowercase snake_case)
pub fn validate_reason(reason: &str) -> Result<(), String> {
    if reason.is_empty() {
        return Err("Reason cannot be empty".to_string());
    }
    if reason.len() > 64 {
        return Err("Reason too long".to_string());
    }
    if !reason_regex().is_match(reason) {
        return Err("Reason must be lowercase snake_case".to_string());
    }
    Ok(())
}

/// Validate an experience award amount
pub fn validate_experience_amount(amount: i32) -> Result<(), String> {
    if amount < 0 {
        return Err("Experience amount cannot be negative".to_string());
    }
    Ok(())
}

/// Validate a rest length in seconds
pub fn validate_rest_seconds(seconds: i32) -> Result<(), String> {
    if seconds < 0 {
        return Err("Rest cannot be negative".to_string());
    }
    if seconds > MAX_REST_SECONDS {
        return Err("Rest cannot exceed one hour".to_string());
    }
    Ok(())
}

/// Validate a set count
pub fn validate_sets(sets: i32) -> Result<(), String> {
    if sets < 1 {
        return Err("An exercise needs at least one set".to_string());
    }
    Ok(())
}

/// Validate a skill stat value
pub fn validate_stat(value: i32) -> Result<(), String> {
    if !(0..=MAX_STAT).contains(&value) {
        return Err(format!("Stat must be between 0 and {}", MAX_STAT));
    }
    Ok(())
}

/// Run a validator and attach the field name to its error
pub fn check(field: &str, result: Result<(), String>) -> Result<(), FieldError> {
    result.map_err(|message| FieldError::new(field, message))
}
