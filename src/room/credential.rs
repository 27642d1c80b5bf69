//! Room access credentials.
//!
//! A credential is an HS256 JWT binding one participant identity to one room,
//! carrying the room-level agent dispatch instruction that makes the realtime
//! platform invite the interviewer worker when the first participant joins.
//! Rooms are created lazily by the platform; nothing here talks to it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};

use super::naming::{self, AgentDispatch};
use crate::config::RealtimeConfig;
use crate::error::{OrchestratorError, Result};

type HmacSha256 = Hmac<Sha256>;

const JWT_ALGORITHM: &str = "HS256";

/// Short-lived, single-room, single-identity credential plus where to use it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCredential {
    pub token: String,
    /// Realtime connection endpoint
    pub url: String,
    pub room_name: String,
}

impl std::fmt::Debug for RoomCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomCredential")
            .field("token", &format!("[REDACTED len={}]", self.token.len()))
            .field("url", &self.url)
            .field("room_name", &self.room_name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room_join: bool,
    pub room: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

/// Room configuration applied when the room is first created
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomConfiguration {
    #[serde(default)]
    pub agents: Vec<AgentDispatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// API key the token was signed for
    pub iss: String,
    /// Participant identity
    pub sub: String,
    /// Participant display name
    #[serde(default)]
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
    pub video: VideoGrant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_config: Option<RoomConfiguration>,
}

impl AccessClaims {
    /// Dispatch entries embedded in the credential
    pub fn dispatches(&self) -> &[AgentDispatch] {
        self.room_config
            .as_ref()
            .map(|c| c.agents.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

/// Mints room credentials for interview sessions
pub struct AccessIssuer {
    api_key: String,
    api_secret: String,
    url: String,
    agent_name: String,
    room_prefix: String,
    agent_identity_prefix: String,
    default_participant_name: String,
    ttl: Duration,
}

impl std::fmt::Debug for AccessIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessIssuer")
            .field("api_key", &self.api_key)
            .field("url", &self.url)
            .field("agent_name", &self.agent_name)
            .field("room_prefix", &self.room_prefix)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AccessIssuer {
    /// Build an issuer from realtime settings.
    ///
    /// Fails with a configuration error when the key pair or URL is missing.
    pub fn from_config(cfg: &RealtimeConfig) -> Result<Self> {
        let api_key = non_empty(&cfg.api_key);
        let api_secret = non_empty(&cfg.api_secret);
        let (api_key, api_secret) = match (api_key, api_secret) {
            (Some(k), Some(s)) => (k, s),
            _ => {
                return Err(OrchestratorError::Configuration(
                    "realtime platform not configured: api_key and api_secret are required"
                        .to_string(),
                ))
            }
        };
        let url = non_empty(&cfg.url).ok_or_else(|| {
            OrchestratorError::Configuration(
                "realtime platform URL not configured".to_string(),
            )
        })?;

        Ok(Self {
            api_key,
            api_secret,
            url,
            agent_name: cfg.agent_name.clone(),
            room_prefix: cfg.room_prefix.clone(),
            agent_identity_prefix: naming::AGENT_IDENTITY_PREFIX.to_string(),
            default_participant_name: cfg.default_participant_name.clone(),
            ttl: cfg.token_ttl(),
        })
    }

    /// Use the agent identity prefix the transcript classifier is configured
    /// with, so issued human identities never collide with it
    pub fn with_agent_identity_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.agent_identity_prefix = prefix.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Agent name embedded in every dispatch instruction; empty means automatic
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn room_prefix(&self) -> &str {
        &self.room_prefix
    }

    pub fn room_name(&self, session_id: &str) -> String {
        naming::room_name(&self.room_prefix, session_id)
    }

    /// The dispatch entry every credential carries
    pub fn dispatch(&self) -> AgentDispatch {
        AgentDispatch::new(self.agent_name.clone())
    }

    pub fn issue(&self, session_id: &str, participant_name: &str) -> Result<RoomCredential> {
        self.issue_at(session_id, participant_name, Utc::now())
    }

    pub fn issue_at(
        &self,
        session_id: &str,
        participant_name: &str,
        now: DateTime<Utc>,
    ) -> Result<RoomCredential> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "session_id must not be empty".to_string(),
            ));
        }

        let participant_name = match participant_name.trim() {
            "" => self.default_participant_name.as_str(),
            name => name,
        };

        let room = self.room_name(session_id);
        let identity =
            naming::participant_identity(participant_name, session_id, &self.agent_identity_prefix);
        let ttl = ChronoDuration::from_std(self.ttl).map_err(|e| {
            OrchestratorError::Configuration(format!("invalid token ttl: {}", e))
        })?;

        let claims = AccessClaims {
            iss: self.api_key.clone(),
            sub: identity,
            name: participant_name.to_string(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            video: VideoGrant {
                room_join: true,
                room: room.clone(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
            },
            room_config: Some(RoomConfiguration {
                agents: vec![self.dispatch()],
            }),
        };

        let token = encode_token(&claims, &self.api_secret)?;

        info!(
            "Issued room credential for session {} (room={}, agent={})",
            session_id,
            room,
            if self.agent_name.is_empty() {
                "<automatic>"
            } else {
                self.agent_name.as_str()
            }
        );

        Ok(RoomCredential {
            token,
            url: self.url.clone(),
            room_name: room,
        })
    }

    /// Check signature and validity window of a token minted by this issuer
    pub fn verify(&self, token: &str) -> Result<AccessClaims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or_else(|| {
            OrchestratorError::Protocol("token is not a JWT".to_string())
        })?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| OrchestratorError::Protocol(format!("bad token signature: {}", e)))?;

        let mut mac = new_mac(&self.api_secret)?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| OrchestratorError::Protocol("token signature mismatch".to_string()))?;

        let claims = decode_claims(token)?;
        let ts = now.timestamp();
        if ts < claims.nbf || ts >= claims.exp {
            debug!("Token for {} outside validity window", claims.sub);
            return Err(OrchestratorError::Protocol("token expired or not yet valid".to_string()));
        }
        if claims.iss != self.api_key {
            return Err(OrchestratorError::Protocol("token issued for another key".to_string()));
        }

        Ok(claims)
    }
}

/// Read a token's claims without checking the signature.
///
/// Clients use this to learn their own identity and room; they never hold the
/// secret needed to verify.
pub fn decode_claims(token: &str) -> Result<AccessClaims> {
    let mut parts = token.split('.');
    let (header, payload) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(_), None) => (h, p),
        _ => return Err(OrchestratorError::Protocol("token is not a JWT".to_string())),
    };

    let header: JwtHeader = decode_segment(header)?;
    if header.alg != JWT_ALGORITHM {
        return Err(OrchestratorError::Protocol(format!(
            "unsupported token algorithm {}",
            header.alg
        )));
    }

    decode_segment(payload)
}

fn encode_token(claims: &AccessClaims, secret: &str) -> Result<String> {
    let header = JwtHeader {
        alg: JWT_ALGORITHM.to_string(),
        typ: "JWT".to_string(),
    };

    let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(claims)?);

    let mut mac = new_mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| OrchestratorError::Configuration(format!("token encoding failed: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| OrchestratorError::Protocol(format!("bad token segment: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| OrchestratorError::Protocol(format!("bad token segment: {}", e)))
}

fn new_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| OrchestratorError::Configuration(format!("invalid signing key: {}", e)))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
