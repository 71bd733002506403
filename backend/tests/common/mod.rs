//! Common test utilities for integration tests
//!
//! The app runs against an `InMemoryStore` seeded with one profile and one
//! routine; requests go through the full router with a signed bearer token.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use tracer_backend::auth::{Claims, AUTHENTICATED_ROLE};
use tracer_backend::{config::AppConfig, repositories::InMemoryStore, routes, state::AppState};
use tracer_shared::models::{
    Challenge, Difficulty, Profile, Routine, RoutineExercise, SkillStats, StatKind,
};
use uuid::Uuid;

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub user_id: Uuid,
    pub routine_id: Uuid,
    pub exercise_ids: Vec<Uuid>,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let user_id = Uuid::new_v4();
        store.insert_profile(profile(user_id, "athlete", false)).await;

        let routine_id = Uuid::new_v4();
        let exercises: Vec<RoutineExercise> = ["Push-ups", "Squats", "Plank"]
            .iter()
            .enumerate()
            .map(|(i, name)| RoutineExercise {
                id: Uuid::new_v4(),
                routine_id,
                name: name.to_string(),
                description: None,
                sets: 3,
                reps: "10".to_string(),
                rest_seconds: 45,
                order_index: i as i32,
            })
            .collect();
        let exercise_ids = exercises.iter().map(|e| e.id).collect();
        store
            .insert_routine(
                Routine {
                    id: routine_id,
                    title: "Full body".to_string(),
                    description: "Three basics".to_string(),
                    difficulty: Difficulty::Beginner,
                    duration_minutes: 30,
                    is_public: true,
                    is_default: true,
                    creator_id: None,
                },
                exercises,
            )
            .await;

        let token = sign_token(&config.jwt.secret, user_id);
        let state = AppState::new(store.clone(), config);
        let app = routes::create_router(state.clone());

        Self {
            app,
            state,
            store,
            user_id,
            routine_id,
            exercise_ids,
            token,
        }
    }

    /// Token for another signed-in user
    pub fn token_for(&self, user_id: Uuid) -> String {
        sign_token(&self.state.config().jwt.secret, user_id)
    }

    pub async fn add_profile(&self, username: &str, is_public: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_profile(profile(id, username, is_public)).await;
        id
    }

    pub async fn add_challenge(&self, stat: StatKind, target: i32, difficulty: Difficulty) -> Uuid {
        let challenge = Challenge {
            id: Uuid::new_v4(),
            title: format!("{} {}", stat, target),
            description: String::new(),
            difficulty,
            category: "stats".to_string(),
            target_value: target,
            stat_type: stat,
            is_active: true,
        };
        let id = challenge.id;
        self.store.insert_challenge(challenge).await;
        id
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, None, Some(&self.token)).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::POST, path, body, Some(&self.token)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, path, Some(body), Some(&self.token)).await
    }

    /// Send a request; the body is parsed as JSON when possible
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        (status, value)
    }
}

/// Sign an access token the way the auth service does
pub fn sign_token(secret: &str, user_id: Uuid) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
        role: Some(AUTHENTICATED_ROLE.to_string()),
        aud: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("Failed to sign test token")
}

fn profile(id: Uuid, username: &str, is_public: bool) -> Profile {
    Profile {
        id,
        username: username.to_string(),
        full_name: username.to_uppercase(),
        is_public,
        stats: SkillStats {
            fuerza: 18,
            resistencia: 20,
            tecnica: 5,
            definicion: 0,
            constancia: 99,
        },
        experience: 45,
    }
}

/// Error code of an `{"error": {...}}` body
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
