//! One-second timer driving an active workout
//!
//! A `Ticker` owns a tokio task that calls [`Tick::tick`] on its target once
//! per period. The task holds only a weak reference, so it ends by itself once
//! the target is dropped; dropping the `Ticker` aborts it immediately.

use std::sync::Weak;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Something advanced by the ticker
pub trait Tick: Send + 'static {
    /// Advance by one period. Returning `false` stops the ticker.
    fn tick(&mut self) -> bool;
}

/// Handle to a running timer task
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Start ticking `target` every `period`, first tick one period from now
    pub fn spawn<T: Tick>(target: Weak<Mutex<T>>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(target) = target.upgrade() else {
                    break;
                };
                let keep_going = target.lock().await.tick();
                if !keep_going {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
