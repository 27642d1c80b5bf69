//! Naming conventions shared by the credential issuer, the transcript
//! classifier and the agent worker.
//!
//! The issuer's agent-name matcher and the worker's registered name must agree
//! exactly. A mismatch produces a room that no agent ever joins, and nothing
//! reports the failure, so all of the matching lives here.

use serde::{Deserialize, Serialize};

/// Namespace every interview room lives under; the dispatch rule is `interview-*`.
pub const DEFAULT_ROOM_PREFIX: &str = "interview-";

/// Identity prefix reserved for agent workers.
pub const AGENT_IDENTITY_PREFIX: &str = "agent-";

/// Prefix given to human identities that would otherwise look like an agent.
const HUMAN_IDENTITY_GUARD: &str = "candidate-";

/// Derive the room name for a session
pub fn room_name(prefix: &str, session_id: &str) -> String {
    format!("{}{}", prefix, session_id)
}

/// Recover the session id from a room name, as the worker does on join.
///
/// Rooms outside the namespace map to `"unknown"`.
pub fn session_id_from_room<'a>(prefix: &str, room: &'a str) -> &'a str {
    match room.strip_prefix(prefix) {
        Some(id) if !id.is_empty() => id,
        _ => "unknown",
    }
}

/// Participant identity for the human side of a session.
///
/// `agent_prefix` must be the prefix the transcript classifier treats as the
/// agent; it is compared case-insensitively, as the classifier does.
pub fn participant_identity(participant_name: &str, session_id: &str, agent_prefix: &str) -> String {
    let identity = format!("{}-{}", participant_name, session_id);
    let agent_prefix = agent_prefix.to_ascii_lowercase();
    if !agent_prefix.is_empty() && identity.to_ascii_lowercase().starts_with(&agent_prefix) {
        format!("{}{}", HUMAN_IDENTITY_GUARD, identity)
    } else {
        identity
    }
}

/// Room-name pattern the platform-side dispatch rule matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRule {
    pub room_prefix: String,
}

impl DispatchRule {
    pub fn new(room_prefix: impl Into<String>) -> Self {
        Self {
            room_prefix: room_prefix.into(),
        }
    }

    pub fn matches(&self, room: &str) -> bool {
        room.len() > self.room_prefix.len() && room.starts_with(&self.room_prefix)
    }
}

impl Default for DispatchRule {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_PREFIX)
    }
}

/// One entry of the dispatch instruction embedded in a room credential.
///
/// An empty `agent_name` selects the unnamed (automatically dispatched)
/// worker pool; a non-empty one selects only workers registered under that
/// exact name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDispatch {
    #[serde(default)]
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata: String,
}

impl AgentDispatch {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            metadata: String::new(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.agent_name.is_empty()
    }
}

/// How an agent worker registered itself with the realtime platform
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerRegistration {
    pub agent_name: String,
}

impl WorkerRegistration {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
        }
    }

    /// Whether this worker is invited by the given dispatch entry.
    ///
    /// Both empty, or identical non-empty strings. Nothing else matches: no
    /// case folding, no trimming.
    pub fn accepts(&self, dispatch: &AgentDispatch) -> bool {
        self.agent_name == dispatch.agent_name
    }
}
