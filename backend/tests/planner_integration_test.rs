//! Integration tests for the weekly planner endpoints

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{error_code, TestApp};
use serde_json::json;
use tracer_shared::models::DayOfWeek;

fn today() -> DayOfWeek {
    DayOfWeek::of(Utc::now().date_naive())
}

#[tokio::test]
async fn test_assign_and_clear_day() {
    let app = TestApp::new().await;

    let (status, body) = app
        .put("/api/v1/planner/monday", json!({ "routine_id": app.routine_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["day"], "monday");

    let (status, week) = app.get("/api/v1/planner").await;
    assert_eq!(status, StatusCode::OK);
    let days = week["days"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["routine_id"], json!(app.routine_id));
    assert!(days[1]["routine_id"].is_null());

    let (status, _) = app
        .put("/api/v1/planner/monday", json!({ "routine_id": null }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, week) = app.get("/api/v1/planner").await;
    assert!(week["days"][0]["routine_id"].is_null());
}

#[tokio::test]
async fn test_assign_unknown_routine() {
    let app = TestApp::new().await;

    let (status, body) = app
        .put("/api/v1/planner/friday", json!({ "routine_id": uuid::Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_day_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .put("/api/v1/planner/funday", json!({ "routine_id": app.routine_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_today_routine_and_start_today() {
    let app = TestApp::new().await;
    let day = today();

    let (_, body) = app.get("/api/v1/planner/today").await;
    assert!(body["routine"].is_null());

    app.put(
        &format!("/api/v1/planner/{}", day),
        json!({ "routine_id": app.routine_id }),
    )
    .await;

    let (status, body) = app.get("/api/v1/planner/today").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["routine"]["title"], "Full body");
    assert_eq!(body["exercises"].as_array().unwrap().len(), 3);

    let (status, body) = app.post("/api/v1/workout/start-today", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["routine"]["id"], json!(app.routine_id));

    let (_, week) = app.get("/api/v1/planner").await;
    let entry = &week["days"][day.offset() as usize];
    assert_eq!(entry["status"], "in_progress");
}

#[tokio::test]
async fn test_manual_status_awards_experience_once() {
    let app = TestApp::new().await;
    let day = today();
    app.put(
        &format!("/api/v1/planner/{}", day),
        json!({ "routine_id": app.routine_id }),
    )
    .await;
    let path = format!("/api/v1/planner/{}/status", day);

    let (status, body) = app.put(&path, json!({ "status": "completed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["completed"], true);
    assert_eq!(body["experience_awarded"], 10);

    let (_, body) = app.put(&path, json!({ "status": "completed" })).await;
    assert_eq!(body["experience_awarded"], 0);

    let (_, body) = app.put(&path, json!({ "status": "incomplete" })).await;
    assert_eq!(body["session"]["completed"], false);

    let (_, week) = app.get("/api/v1/planner").await;
    assert_eq!(week["days"][day.offset() as usize]["status"], "in_progress");

    let (_, progress) = app.get("/api/v1/profile/progress").await;
    assert_eq!(progress["experience"], 55);
}
