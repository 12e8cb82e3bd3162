use super::state::AppState;
use crate::session::{SessionConfig, SessionMode, SessionStats, StreamSession, TranscriptEntry};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    /// Microphone only
    Audio,
    /// Microphone plus one camera still per second
    Camera,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub mode: StartMode,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub client_id: String,
    pub mode: SessionMode,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start capturing in the requested mode, connecting on first use
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    // One persistent connection per client session: reuse it across capture
    // runs, connect lazily the first time.
    let existing = { state.session.read().await.clone() };

    let session = match existing {
        Some(session) => session,
        None => {
            let config = SessionConfig::from_app_config(&state.config);
            info!("Connecting session: {}", config.client_id);

            match StreamSession::connect(config).await {
                Ok(session) => {
                    let session = Arc::new(session);
                    *state.session.write().await = Some(Arc::clone(&session));
                    session
                }
                Err(e) => {
                    error!("Failed to connect session: {:#}", e);
                    return (
                        StatusCode::BAD_GATEWAY,
                        Json(ErrorResponse {
                            error: format!("Failed to connect session: {:#}", e),
                        }),
                    )
                        .into_response();
                }
            }
        }
    };

    if session.mode().await != SessionMode::Idle {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "capture already active; stop it first".to_string(),
            }),
        )
            .into_response();
    }

    let result = match req.mode {
        StartMode::Audio => session.start_audio_only().await,
        StartMode::Camera => session.start_camera().await,
    };

    match result {
        Ok(()) => {
            let mode = session.mode().await;
            (
                StatusCode::OK,
                Json(StartSessionResponse {
                    client_id: session.client_id().to_string(),
                    mode,
                    status: "streaming".to_string(),
                    message: format!("Capture started ({:?})", mode),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start capture: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("{:#}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /session/stop
/// Stop capturing; the connection stays open for the next capture run
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = { state.session.read().await.clone() };

    match session {
        Some(session) => match session.stop().await {
            Ok(stats) => (
                StatusCode::OK,
                Json(StopSessionResponse {
                    status: "stopped".to_string(),
                    message: "Capture stopped".to_string(),
                    stats,
                }),
            )
                .into_response(),
            Err(e) => {
                error!("Failed to stop capture: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to stop capture: {:#}", e),
                    }),
                )
                    .into_response()
            }
        },
        None => session_not_found(),
    }
}

/// POST /session/close
/// Stop capturing and close the connection
pub async fn close_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = { state.session.write().await.take() };

    match session {
        Some(session) => match session.shutdown().await {
            Ok(stats) => (
                StatusCode::OK,
                Json(StopSessionResponse {
                    status: "closed".to_string(),
                    message: "Session closed".to_string(),
                    stats,
                }),
            )
                .into_response(),
            Err(e) => {
                error!("Failed to close session: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to close session: {:#}", e),
                    }),
                )
                    .into_response()
            }
        },
        None => session_not_found(),
    }
}

/// GET /session/status
/// Current session statistics
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let session = { state.session.read().await.clone() };

    match session {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => session_not_found(),
    }
}

/// GET /session/transcript
/// Accumulated text responses
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let session = { state.session.read().await.clone() };

    match session {
        Some(session) => {
            let transcript: Vec<TranscriptEntry> = session.transcript();
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => session_not_found(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn session_not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "No active session".to_string(),
        }),
    )
        .into_response()
}
