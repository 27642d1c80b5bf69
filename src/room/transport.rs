use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Who sent something into the room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantInfo {
    pub identity: String,
    /// Display name, may be empty
    pub name: String,
}

impl ParticipantInfo {
    pub fn new(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
        }
    }
}

/// Opening frame of a text stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStreamHeader {
    pub stream_id: String,
    pub topic: String,
    /// Stream-level attributes (segment id, finality flag, transcribed track)
    pub attributes: HashMap<String, String>,
    pub participant: ParticipantInfo,
}

/// Why the room connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The other side closed the room or removed us (agent ended the call)
    RoomClosed,
    /// The transport lost its connection
    ConnectionLost,
    /// The platform closed the connection for another reason
    Server(String),
}

/// Everything the room delivers to a subscribed client, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    TextStreamOpened(TextStreamHeader),
    TextStreamChunk { stream_id: String, text: String },
    TextStreamClosed { stream_id: String },
    Data {
        topic: String,
        payload: Vec<u8>,
        participant: ParticipantInfo,
    },
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(ParticipantInfo),
    Disconnected(DisconnectReason),
}

/// Realtime room platform
///
/// Implementations:
/// - NATS bridge (`crate::nats::NatsRoomTransport`)
/// - In-memory fakes in tests
#[async_trait::async_trait]
pub trait RoomTransport: Send + Sync {
    /// Join the room a credential was issued for
    async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn RoomConnection>>;
}

/// A live connection to one room, held by exactly one session monitor
#[async_trait::async_trait]
pub trait RoomConnection: Send + Sync {
    /// Identity this connection joined as
    fn local_identity(&self) -> &str;

    fn room_name(&self) -> &str;

    /// Subscribe to a text stream topic plus room-level events.
    ///
    /// Dropping the receiver unregisters the subscription.
    async fn subscribe_text_stream(&mut self, topic: &str) -> Result<mpsc::Receiver<RoomEvent>>;

    /// Leave the room; safe to call more than once
    async fn disconnect(&mut self) -> Result<()>;
}
