use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::credential::{AccessIssuer, RoomCredential};
use super::naming;
use crate::error::{OrchestratorError, Result};

/// Body of `POST /livekit/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    #[serde(alias = "sessionId")]
    pub session_id: String,
    #[serde(default, alias = "participantName")]
    pub participant_name: Option<String>,
}

/// Response of `POST /livekit/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub url: String,
    #[serde(alias = "roomName")]
    pub room_name: String,
}

impl From<RoomCredential> for TokenResponse {
    fn from(c: RoomCredential) -> Self {
        Self {
            token: c.token,
            url: c.url,
            room_name: c.room_name,
        }
    }
}

impl From<TokenResponse> for RoomCredential {
    fn from(r: TokenResponse) -> Self {
        Self {
            token: r.token,
            url: r.url,
            room_name: r.room_name,
        }
    }
}

/// Source of room credentials for a session join attempt
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn issue(&self, session_id: &str, participant_name: &str) -> Result<RoomCredential>;
}

#[async_trait::async_trait]
impl CredentialProvider for AccessIssuer {
    async fn issue(&self, session_id: &str, participant_name: &str) -> Result<RoomCredential> {
        AccessIssuer::issue(self, session_id, participant_name)
    }
}

/// Calls a remote credential issuance endpoint
#[derive(Debug, Clone)]
pub struct HttpCredentialClient {
    http: reqwest::Client,
    base_url: String,
    room_prefix: String,
}

impl HttpCredentialClient {
    pub fn new(base_url: impl Into<String>, room_prefix: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, room_prefix)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        room_prefix: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            room_prefix: room_prefix.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "error")]
    detail: Option<String>,
}

#[async_trait::async_trait]
impl CredentialProvider for HttpCredentialClient {
    async fn issue(&self, session_id: &str, participant_name: &str) -> Result<RoomCredential> {
        let url = format!("{}/livekit/token", self.base_url);
        let body = TokenRequest {
            session_id: session_id.to_string(),
            participant_name: Some(participant_name.to_string()),
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestratorError::Transport(format!("credential request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| status.to_string());
            warn!("Credential endpoint refused session {}: {}", session_id, detail);
            return Err(OrchestratorError::Configuration(detail));
        }

        let token: TokenResponse = resp.json().await.map_err(|e| {
            OrchestratorError::Configuration(format!("undecodable credential response: {}", e))
        })?;

        let expected = naming::room_name(&self.room_prefix, session_id);
        if token.room_name != expected {
            warn!(
                "Credential endpoint returned room {} for session {}, expected {}",
                token.room_name, session_id, expected
            );
            return Err(OrchestratorError::Configuration(format!(
                "room name {} does not match dispatch pattern (expected {})",
                token.room_name, expected
            )));
        }

        info!("Received room credential for {}", token.room_name);
        Ok(token.into())
    }
}
