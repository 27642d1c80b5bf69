//! Speaker classification.
//!
//! The agent is recognised by naming convention: a reserved identity prefix or
//! a marker word in the display name. String matching is fragile, so it is
//! kept behind `classify_speaker` and nothing else in the normalizer looks at
//! identities.

use crate::config::TranscriptConfig;
use crate::room::transport::ParticipantInfo;

use super::fragment::SpeakerRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerClass {
    Human,
    Agent,
    /// Some other participant, e.g. the agent's media-rendering proxy.
    /// Its lines would duplicate the agent's, so they are never materialized.
    Excluded,
}

impl SpeakerClass {
    pub fn role(self) -> Option<SpeakerRole> {
        match self {
            SpeakerClass::Human => Some(SpeakerRole::Human),
            SpeakerClass::Agent => Some(SpeakerRole::Agent),
            SpeakerClass::Excluded => None,
        }
    }
}

/// Agent naming convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentNaming {
    /// Compared case-insensitively against the identity start
    pub identity_prefix: String,
    /// Lowercase substrings searched for in the display name
    pub name_markers: Vec<String>,
}

impl AgentNaming {
    pub fn from_config(cfg: &TranscriptConfig) -> Self {
        Self {
            identity_prefix: cfg.agent_identity_prefix.to_ascii_lowercase(),
            name_markers: cfg
                .agent_name_markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    fn is_agent(&self, participant: &ParticipantInfo) -> bool {
        let identity = participant.identity.to_ascii_lowercase();
        if !self.identity_prefix.is_empty() && identity.starts_with(&self.identity_prefix) {
            return true;
        }

        let name = participant.name.to_lowercase();
        self.name_markers.iter().any(|m| name.contains(m.as_str()))
    }
}

impl Default for AgentNaming {
    fn default() -> Self {
        Self::from_config(&TranscriptConfig::default())
    }
}

/// Decide which side of the conversation a participant speaks for.
///
/// The local identity always wins, so the human is never reported as the
/// agent even if their display name contains a marker.
pub fn classify_speaker(
    participant: &ParticipantInfo,
    local_identity: &str,
    naming: &AgentNaming,
) -> SpeakerClass {
    if participant.identity == local_identity {
        SpeakerClass::Human
    } else if naming.is_agent(participant) {
        SpeakerClass::Agent
    } else {
        SpeakerClass::Excluded
    }
}
