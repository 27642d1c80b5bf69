use thiserror::Error;

/// Error taxonomy shared by the session components.
///
/// Only `Configuration` is terminal for the voice path; every other kind is
/// either retried (transport, report) or dropped at the boundary (protocol).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Realtime platform credentials missing, signing failed, or the room name
    /// handed back does not match what the agent dispatch rule expects.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network hiccup talking to the room or an HTTP collaborator.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed frame or payload from the room.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Report endpoint failed, answered non-2xx, or returned an undecodable body.
    #[error("report error: {0}")]
    Report(String),
}

impl OrchestratorError {
    /// Whether the voice session should fall back to text-only mode.
    pub fn degrades_to_text(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Configuration(_) | OrchestratorError::Transport(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
