use super::state::AppState;
use crate::conversation::{LoopState, TurnOutcome};
use crate::error::AgentError;
use crate::session::{ConversationStats, SessionId};
use crate::turn::SpeechRequest;
use crate::ui::SurfaceView;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub state: LoopState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub stats: ConversationStats,
    pub surface: SurfaceView,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,

    /// Optional voice (the configured default is used if missing)
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeakResponse {
    pub audio_url: String,
    pub voice_used: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

fn error_response(err: &AgentError) -> Response {
    let status = match err {
        AgentError::PermissionDenied => StatusCode::FORBIDDEN,
        AgentError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AgentError::AlreadyRecording | AgentError::TurnInProgress => StatusCode::CONFLICT,
        AgentError::EmptyInput => StatusCode::BAD_REQUEST,
        AgentError::BackendRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::BackendUnavailable(_) | AgentError::BackendDegraded { .. } => {
            StatusCode::BAD_GATEWAY
        }
        AgentError::Playback(_) | AgentError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let suggestions = match err {
        AgentError::BackendRejected { suggestions, .. } => suggestions.clone(),
        _ => Vec::new(),
    };

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            suggestions,
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(SessionResponse {
        session_id: state.session_id.clone(),
        address: state.address.clone(),
    })
}

/// POST /conversation/start
/// Request the capture device and start recording
pub async fn start_conversation(State(state): State<AppState>) -> Response {
    info!("Starting conversation for session: {}", state.session_id);

    match state.conversation.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StateResponse {
                state: state.conversation.state(),
                message: "Recording... Speak now!".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to start conversation: {}", e);
            error_response(&e)
        }
    }
}

/// POST /conversation/stop
/// Stop recording; the turn runs in the background
pub async fn stop_turn(State(state): State<AppState>) -> Response {
    if state.conversation.state() != LoopState::Capturing {
        return error_response(&AgentError::TurnInProgress);
    }

    let conversation = Arc::clone(&state.conversation);
    tokio::spawn(async move {
        match conversation.finish_turn().await {
            Ok(TurnOutcome::Completed { result, restarted }) => info!(
                "Turn {} completed (degraded={}, restarted={})",
                result.unit_id, result.degraded, restarted
            ),
            Ok(TurnOutcome::Interrupted { result }) => {
                info!("Turn {} finished after conversation stop", result.unit_id)
            }
            Ok(TurnOutcome::NothingCaptured) => info!("Stop requested with nothing captured"),
            Err(e) => error!("Turn failed: {}", e),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(StateResponse {
            state: LoopState::Processing,
            message: "Processing...".to_string(),
        }),
    )
        .into_response()
}

/// POST /conversation/cancel
/// Stop the conversation and any automatic restart
pub async fn cancel_conversation(State(state): State<AppState>) -> impl IntoResponse {
    let loop_state = state.conversation.cancel().await;

    Json(StateResponse {
        state: loop_state,
        message: "Conversation stopped".to_string(),
    })
}

/// GET /conversation/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        stats: state.conversation.stats(),
        surface: state.surface.view(),
    })
}

/// GET /voices
pub async fn list_voices(State(state): State<AppState>) -> impl IntoResponse {
    Json(VoicesResponse {
        voices: state.speech.load_voices().await,
    })
}

/// POST /speak
/// Synthesize text with the chosen voice
pub async fn speak(State(state): State<AppState>, Json(req): Json<SpeakRequest>) -> Response {
    let request = match SpeechRequest::new(&req.text, req.voice.as_deref().unwrap_or_default()) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match state.speech.speak(request).await {
        Ok(speech) => (
            StatusCode::OK,
            Json(SpeakResponse {
                audio_url: speech.audio.to_string(),
                voice_used: speech.voice_used,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
