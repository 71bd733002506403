//! Retry of transient store failures

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::WorkoutConfig;
use crate::repositories::StoreResult;

/// Fixed retry schedule: attempt `n` waits `backoff * n` before the next try.
///
/// Only transient errors are retried; not-found and conflict answers are
/// returned immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &WorkoutConfig) -> Self {
        Self::new(config.persist_attempts, config.retry_backoff())
    }

    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `call` until it succeeds, fails permanently or attempts run out
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    warn!(operation, attempt, error = %err, "Store call failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WorkoutConfig::default())
    }
}
