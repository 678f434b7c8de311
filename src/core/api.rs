//! HTTP + WebSocket surface for driving validation sessions remotely
//!
//! Endpoints:
//! - POST /session/new - Create a session and start its runtime
//! - POST /session/{id}/frame - Push one landmark frame
//! - POST /session/{id}/reset - Reset the session to idle
//! - GET /session/{id} - Current state snapshot
//! - WS /ws/{id} - Live state updates
//! - GET /health - Health check
//!
//! Each session owns a [`ChallengeRuntime`] task; handlers only enqueue
//! events and read state snapshots, so a slow client never blocks the state
//! machine. Responses carry the snapshot current at enqueue time; the effect
//! of the pushed frame shows up in the next snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use crate::core::backend::{EvidenceSource, LatestFrameEvidence, ScoringBackend};
use crate::core::runtime::{ChallengeRuntime, RuntimeHandle};
use crate::core::session::generate_session_id;
use crate::types::{ChallengeConfig, DetectionSample, RawLandmark, Thresholds, ValidationState};

/// One live session: its runtime handle and the evidence slot the client
/// pushes photos into
pub struct SessionEntry {
    pub handle: RuntimeHandle,
    pub evidence: Arc<LatestFrameEvidence>,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, SessionEntry>>,
    pub config: ChallengeConfig,
    pub thresholds: Thresholds,
    pub backend: Arc<dyn ScoringBackend>,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    /// Movements in the session, clamped to the available types
    pub steps: Option<usize>,
    /// Fixed RNG seed, for reproducible sequences
    pub seed: Option<u64>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub total_steps: u32,
    pub websocket_url: String,
}

/// Push frame request: the raw landmark array plus optional photo evidence
#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    pub landmarks: Vec<RawLandmark>,
    pub photo_base64: Option<String>,
}

/// Push frame response
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    /// False when the landmark set was too sparse and the frame was skipped
    pub accepted: bool,
    pub state: ValidationState,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Create the API router
pub fn create_router(
    config: ChallengeConfig,
    thresholds: Thresholds,
    backend: Arc<dyn ScoringBackend>,
) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        config,
        thresholds,
        backend,
    });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session))
        .route("/session/:id/frame", post(push_frame))
        .route("/session/:id/reset", post(reset_session))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create a session, spawn its runtime and start the challenge
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, StatusCode> {
    let mut id_rng = SmallRng::from_entropy();
    let session_id = generate_session_id(&mut id_rng);

    let mut config = state.config.clone();
    if let Some(steps) = req.steps {
        config.steps = steps;
    }
    let total_steps = config.effective_steps() as u32;

    let evidence = Arc::new(LatestFrameEvidence::new());
    let (runtime, handle, rx) = ChallengeRuntime::new(
        config,
        state.thresholds,
        Arc::clone(&state.backend),
        Arc::clone(&evidence) as Arc<dyn EvidenceSource>,
        req.seed,
    );
    tokio::spawn(runtime.run(rx));
    handle.start(Some(session_id.clone())).await;

    let mut sessions = state.sessions.write().await;
    sessions.insert(
        session_id.clone(),
        SessionEntry {
            handle,
            evidence,
        },
    );
    info!(%session_id, total_steps, "session created");

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
        total_steps,
    }))
}

/// Current state snapshot
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ValidationState>, StatusCode> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(entry.handle.state()))
}

/// Push one landmark frame into the session
async fn push_frame(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<FrameRequest>,
) -> Result<Json<FrameResponse>, StatusCode> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    if let Some(photo) = req.photo_base64 {
        entry.evidence.store(photo);
    }

    // A sparse landmark set means no face was detected; the frame is skipped
    // rather than misread
    let accepted = match DetectionSample::from_landmarks(&req.landmarks) {
        Some(sample) => {
            entry.handle.frame(sample).await;
            true
        }
        None => {
            debug!(session_id = %id, count = req.landmarks.len(), "sparse frame skipped");
            false
        }
    };

    Ok(Json(FrameResponse {
        accepted,
        state: entry.handle.state(),
    }))
}

/// Reset the session to idle; it can be restarted over the same id's runtime
async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ValidationState>, StatusCode> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    entry.handle.reset().await;
    Ok(Json(entry.handle.state()))
}

/// WebSocket handler for live state updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let sessions = state.sessions.read().await;
    let entry = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rx = entry.handle.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Stream every state replacement; the first message is the current snapshot
async fn handle_websocket(socket: WebSocket, mut rx: watch::Receiver<ValidationState>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        if sender.send(Message::Text(json)).await.is_err() {
            break;
        }
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                // Clients only listen; any close or error ends the stream
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}

/// Run the API server
pub async fn run_server(
    addr: &str,
    config: ChallengeConfig,
    thresholds: Thresholds,
    backend: Arc<dyn ScoringBackend>,
) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(config, thresholds, backend);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("👁 vida liveness API running on {}", addr);
    println!("  POST /session/new        - Create session");
    println!("  POST /session/:id/frame  - Push landmark frame");
    println!("  POST /session/:id/reset  - Reset session");
    println!("  GET  /session/:id        - Get state");
    println!("  WS   /ws/:id             - Live updates");
    println!("  GET  /health             - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
