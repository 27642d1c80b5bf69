use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::room::AccessIssuer;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` when the realtime platform is not configured; token requests
    /// then fail closed with `issuer_error`
    pub issuer: Option<Arc<AccessIssuer>>,
    pub issuer_error: Option<String>,
    /// Configured values, reported by the health check when there is no issuer
    pub agent_name: String,
    pub room_prefix: String,
}

impl AppState {
    pub fn new(issuer: AccessIssuer) -> Self {
        let agent_name = issuer.agent_name().to_string();
        let room_prefix = issuer.room_prefix().to_string();
        Self {
            issuer: Some(Arc::new(issuer)),
            issuer_error: None,
            agent_name,
            room_prefix,
        }
    }

    /// Build state from settings, keeping the server up when the realtime
    /// section is incomplete
    pub fn from_config(cfg: &Config) -> Self {
        let realtime = &cfg.realtime;
        match AccessIssuer::from_config(realtime) {
            Ok(issuer) => Self::new(
                issuer.with_agent_identity_prefix(cfg.transcript.agent_identity_prefix.clone()),
            ),
            Err(e) => {
                warn!("Room credentials unavailable: {}", e);
                Self {
                    issuer: None,
                    issuer_error: Some(e.to_string()),
                    agent_name: realtime.agent_name.clone(),
                    room_prefix: realtime.room_prefix.clone(),
                }
            }
        }
    }
}
