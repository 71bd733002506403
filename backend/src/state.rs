//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! All fields are `Arc`s or already cheap to clone, and nothing here is
//! rebuilt after startup.

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::repositories::Store;
use crate::services::{RetryPolicy, WorkoutService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT verifier with cached keys
    pub jwt: JwtService,
    /// Live workout engines
    pub workouts: WorkoutService,
    /// Retry policy for experience and stat writes outside the workout flow
    pub retry: RetryPolicy,
    /// Prometheus render handle, `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Derives the JWT keys, so call it once at startup.
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.audience.clone());
        let workouts = WorkoutService::new(store.clone(), config.workout.clone());
        let retry = RetryPolicy::from_config(&config.workout);

        Self {
            store,
            config: Arc::new(config),
            jwt,
            workouts,
            retry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn workouts(&self) -> &WorkoutService {
        &self.workouts
    }

    #[inline]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryStore;

    #[tokio::test]
    async fn test_state_clone_shares_engines() {
        let state = AppState::new(Arc::new(InMemoryStore::new()), AppConfig::default());
        let cloned = state.clone();

        let user_id = uuid::Uuid::new_v4();
        let _ = state.workouts().engine(user_id).await;
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
        assert_eq!(
            cloned.workouts().snapshot(user_id).await.state,
            tracer_shared::workout::MachineState::Idle
        );
    }

    #[test]
    fn test_jwt_service_is_precomputed() {
        let state = AppState::new(Arc::new(InMemoryStore::new()), AppConfig::default());
        let user_id = uuid::Uuid::new_v4();
        let token = state.jwt().issue_token(user_id, 60).unwrap();
        assert_eq!(state.jwt().authenticate(&token).unwrap(), user_id);
    }
}
