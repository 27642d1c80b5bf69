use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tracing::debug;

use crate::room::transport::{DisconnectReason, ParticipantInfo, RoomEvent, TextStreamHeader};

/// Subjects used by the room bridge, all scoped to one room
pub mod subjects {
    pub fn join(room: &str) -> String {
        format!("room.{}.join", room)
    }

    pub fn leave(room: &str) -> String {
        format!("room.{}.leave", room)
    }

    pub fn text(room: &str, topic: &str) -> String {
        format!("room.{}.text.{}", room, topic)
    }

    pub fn data(room: &str, topic: &str) -> String {
        format!("room.{}.data.{}", room, topic)
    }

    pub fn participant(room: &str) -> String {
        format!("room.{}.participant", room)
    }

    pub fn closed(room: &str) -> String {
        format!("room.{}.closed", room)
    }

    /// Every subject of one room
    pub fn all(room: &str) -> String {
        format!("room.{}.>", room)
    }
}

/// Published by a client when it enters a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAnnouncement {
    pub room: String,
    pub identity: String,
    pub name: String,
    /// Credential the bridge verifies before admitting the participant
    pub token: String,
    pub timestamp: String, // RFC3339 timestamp
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveAnnouncement {
    pub room: String,
    pub identity: String,
    pub timestamp: String,
}

/// One frame of a text stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum TextStreamMessage {
    Open {
        stream_id: String,
        #[serde(default)]
        attributes: HashMap<String, String>,
        participant_identity: String,
        #[serde(default)]
        participant_name: String,
    },
    Chunk {
        stream_id: String,
        text: String,
    },
    Close {
        stream_id: String,
    },
}

impl TextStreamMessage {
    pub fn into_event(self, topic: &str) -> RoomEvent {
        match self {
            TextStreamMessage::Open {
                stream_id,
                attributes,
                participant_identity,
                participant_name,
            } => RoomEvent::TextStreamOpened(TextStreamHeader {
                stream_id,
                topic: topic.to_string(),
                attributes,
                participant: ParticipantInfo::new(participant_identity, participant_name),
            }),
            TextStreamMessage::Chunk { stream_id, text } => {
                RoomEvent::TextStreamChunk { stream_id, text }
            }
            TextStreamMessage::Close { stream_id } => RoomEvent::TextStreamClosed { stream_id },
        }
    }
}

/// Reliable data packet on a named topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMessage {
    pub topic: String,
    pub payload: String, // Base64-encoded bytes
    pub participant_identity: String,
    #[serde(default)]
    pub participant_name: String,
}

impl DataMessage {
    pub fn new(topic: &str, payload: &[u8], participant: &ParticipantInfo) -> Self {
        Self {
            topic: topic.to_string(),
            payload: base64::engine::general_purpose::STANDARD.encode(payload),
            participant_identity: participant.identity.clone(),
            participant_name: participant.name.clone(),
        }
    }

    pub fn into_event(self) -> Result<RoomEvent, base64::DecodeError> {
        let payload = base64::engine::general_purpose::STANDARD.decode(&self.payload)?;
        Ok(RoomEvent::Data {
            topic: self.topic,
            payload,
            participant: ParticipantInfo::new(self.participant_identity, self.participant_name),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ParticipantMessage {
    Joined { identity: String, #[serde(default)] name: String },
    Left { identity: String, #[serde(default)] name: String },
}

impl ParticipantMessage {
    pub fn into_event(self) -> RoomEvent {
        match self {
            ParticipantMessage::Joined { identity, name } => {
                RoomEvent::ParticipantJoined(ParticipantInfo::new(identity, name))
            }
            ParticipantMessage::Left { identity, name } => {
                RoomEvent::ParticipantLeft(ParticipantInfo::new(identity, name))
            }
        }
    }
}

/// The room was closed for everyone (agent ended the call, server shutdown)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomClosedMessage {
    #[serde(default)]
    pub reason: Option<String>,
}

impl RoomClosedMessage {
    pub fn into_event(self) -> RoomEvent {
        let reason = match self.reason {
            None => DisconnectReason::RoomClosed,
            Some(r) if r.is_empty() || r == "room_closed" => DisconnectReason::RoomClosed,
            Some(r) => DisconnectReason::Server(r),
        };
        RoomEvent::Disconnected(reason)
    }
}

/// Decode a message received on the room-wide subscription.
///
/// Returns `None` for subjects a client does not consume (join and leave
/// announcements, text topics other than `text_topic`) and for malformed
/// payloads.
pub fn decode_room_message(
    room: &str,
    text_topic: &str,
    subject: &str,
    payload: &[u8],
) -> Option<RoomEvent> {
    let kind = subject.strip_prefix("room.")?.strip_prefix(room)?.strip_prefix('.')?;

    if let Some(topic) = kind.strip_prefix("text.") {
        if topic != text_topic {
            return None;
        }
        return match serde_json::from_slice::<TextStreamMessage>(payload) {
            Ok(msg) => Some(msg.into_event(text_topic)),
            Err(e) => {
                debug!("Dropping malformed text stream frame: {}", e);
                None
            }
        };
    }

    if kind.starts_with("data.") {
        let event = serde_json::from_slice::<DataMessage>(payload)
            .map_err(|e| e.to_string())
            .and_then(|d| d.into_event().map_err(|e| e.to_string()));
        return match event {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("Dropping malformed data packet: {}", e);
                None
            }
        };
    }

    match kind {
        "participant" => serde_json::from_slice::<ParticipantMessage>(payload)
            .ok()
            .map(ParticipantMessage::into_event),
        "closed" => {
            let msg = serde_json::from_slice::<RoomClosedMessage>(payload).unwrap_or_default();
            Some(msg.into_event())
        }
        _ => None,
    }
}
