use super::state::AppState;
use crate::error::OrchestratorError;
use crate::room::{TokenRequest, TokenResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct RealtimeHealthResponse {
    pub livekit_configured: bool,
    /// "Not configured" when no issuer is available
    pub url: String,
    pub agent_name: String,
    pub room_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /livekit/token
/// Mint a room credential for a session
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> impl IntoResponse {
    let issuer = match &state.issuer {
        Some(issuer) => issuer,
        None => {
            let detail = state
                .issuer_error
                .clone()
                .unwrap_or_else(|| "realtime platform not configured".to_string());
            error!("Token request for session {} refused: {}", req.session_id, detail);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, detail);
        }
    };

    let name = req.participant_name.as_deref().unwrap_or("");
    match issuer.issue(&req.session_id, name) {
        Ok(credential) => {
            info!("Token issued for room {}", credential.room_name);
            (StatusCode::OK, Json(TokenResponse::from(credential))).into_response()
        }
        Err(OrchestratorError::InvalidRequest(detail)) => {
            error_response(StatusCode::BAD_REQUEST, detail)
        }
        Err(e) => {
            error!("Failed to issue token: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to generate token: {}", e),
            )
        }
    }
}

/// GET /livekit/health
/// Whether room credentials can be issued
pub async fn realtime_health(State(state): State<AppState>) -> impl IntoResponse {
    let body = match &state.issuer {
        Some(issuer) => RealtimeHealthResponse {
            livekit_configured: true,
            url: issuer.url().to_string(),
            agent_name: issuer.agent_name().to_string(),
            room_prefix: issuer.room_prefix().to_string(),
            detail: None,
        },
        None => RealtimeHealthResponse {
            livekit_configured: false,
            url: "Not configured".to_string(),
            agent_name: state.agent_name.clone(),
            room_prefix: state.room_prefix.clone(),
            detail: state.issuer_error.clone(),
        },
    };
    (StatusCode::OK, Json(body))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
