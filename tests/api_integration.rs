//! Integration tests for the HTTP API
//!
//! Handlers only enqueue events; the session runtime applies them on its own
//! task, so state assertions follow a short settle pause.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use vida::core::api::create_router;
use vida::core::SimulatedBackend;
use vida::types::{ChallengeConfig, Thresholds};
use vida::MIN_LANDMARK_COUNT;

fn test_router() -> axum::Router {
    create_router(
        ChallengeConfig::default(),
        Thresholds::default(),
        Arc::new(SimulatedBackend::default()),
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// A full landmark array for a centered face
fn centered_landmarks() -> Vec<[f64; 3]> {
    let mut points = vec![[0.0, 0.0, 0.0]; MIN_LANDMARK_COUNT];
    points[1] = [0.5, 0.5, 0.0];
    points[33] = [0.40, 0.45, 0.0];
    points[263] = [0.60, 0.45, 0.0];
    points[159] = [0.58, 0.44, 0.0];
    points[145] = [0.58, 0.46, 0.0];
    points[386] = [0.42, 0.44, 0.0];
    points[374] = [0.42, 0.46, 0.0];
    points
}

async fn create_session(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/session/new")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"seed": 7}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["websocket_url"].is_string());
    assert_eq!(json["total_steps"], 3);
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_create_session_starts_challenge() {
    let app = test_router();
    let id = create_session(&app).await;

    // Let the runtime task process the start event
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/session/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["is_in_progress"], true);
    assert_eq!(json["phase"], "centering");
    assert_eq!(json["session_id"], id.as_str());
    assert_eq!(json["total_steps"], 3);
    assert!(json["current_movement"].is_string());
}

#[tokio::test]
async fn test_session_not_found() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/session/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sparse_frame_is_skipped() {
    let app = test_router();
    let id = create_session(&app).await;

    let payload = json!({ "landmarks": [[0.5, 0.5, 0.0]] });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/session/{}/frame", id))
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
}

#[tokio::test]
async fn test_centered_frame_advances_to_countdown() {
    let app = test_router();
    let id = create_session(&app).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let payload = json!({
        "landmarks": centered_landmarks(),
        "photo_base64": "data:image/jpeg;base64,cGhvdG8=",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/session/{}/frame", id))
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["accepted"], true);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/session/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["phase"], "preparing");
}

#[tokio::test]
async fn test_reset_returns_session_to_idle() {
    let app = test_router();
    let id = create_session(&app).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/session/{}/reset", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/session/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["phase"], "idle");
    assert_eq!(json["is_in_progress"], false);
}
