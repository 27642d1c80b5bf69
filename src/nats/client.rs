use anyhow::{Context, Result};
use async_nats::Client;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{decode_room_message, subjects, JoinAnnouncement, LeaveAnnouncement};
use crate::room::credential::decode_claims;
use crate::room::transport::{DisconnectReason, RoomConnection, RoomEvent, RoomTransport};

const EVENT_BUFFER: usize = 256;

/// Room transport over a NATS bridge.
///
/// The credential's claims name the room and the local identity; the bridge
/// verifies the token carried in the join announcement.
#[derive(Debug, Clone, Default)]
pub struct NatsRoomTransport;

impl NatsRoomTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl RoomTransport for NatsRoomTransport {
    async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn RoomConnection>> {
        let claims = decode_claims(token).context("Unreadable room credential")?;

        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let connection = NatsRoomConnection {
            client,
            room: claims.video.room,
            identity: claims.sub,
            name: claims.name,
            forwarder: None,
            left: false,
        };
        connection.announce_join(token).await?;

        Ok(Box::new(connection))
    }
}

pub struct NatsRoomConnection {
    client: Client,
    room: String,
    identity: String,
    name: String,
    forwarder: Option<JoinHandle<()>>,
    left: bool,
}

impl NatsRoomConnection {
    async fn announce_join(&self, token: &str) -> Result<()> {
        let message = JoinAnnouncement {
            room: self.room.clone(),
            identity: self.identity.clone(),
            name: self.name.clone(),
            token: token.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subjects::join(&self.room), payload.into())
            .await
            .context("Failed to announce join")?;

        info!("Joined room {} as {}", self.room, self.identity);
        Ok(())
    }

    /// One subscription for the whole room, so events reach the client in
    /// publish order and a close never overtakes the text frames before it.
    async fn subscribe_room(&self, topic: &str) -> Result<BoxStream<'static, Option<RoomEvent>>> {
        let room = self.room.clone();
        let topic = topic.to_string();

        let subscriber = self
            .client
            .subscribe(subjects::all(&self.room))
            .await
            .context("Failed to subscribe to room")?;

        Ok(subscriber
            .map(move |m| decode_room_message(&room, &topic, &m.subject, &m.payload))
            .boxed())
    }
}

#[async_trait::async_trait]
impl RoomConnection for NatsRoomConnection {
    fn local_identity(&self) -> &str {
        &self.identity
    }

    fn room_name(&self) -> &str {
        &self.room
    }

    async fn subscribe_text_stream(&mut self, topic: &str) -> Result<mpsc::Receiver<RoomEvent>> {
        if let Some(previous) = self.forwarder.take() {
            previous.abort();
        }

        let mut events = self.subscribe_room(topic).await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let room = self.room.clone();

        info!("Subscribed to {} in room {}", topic, room);

        self.forwarder = Some(tokio::spawn(async move {
            while let Some(item) = events.next().await {
                let Some(event) = item else { continue };
                let closed = matches!(event, RoomEvent::Disconnected(_));
                if tx.send(event).await.is_err() {
                    debug!("Room event receiver dropped for {}", room);
                    return;
                }
                if closed {
                    return;
                }
            }
            warn!("NATS subscription for room {} ended", room);
            let _ = tx
                .send(RoomEvent::Disconnected(DisconnectReason::ConnectionLost))
                .await;
        }));

        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if self.left {
            return Ok(());
        }
        self.left = true;

        let message = LeaveAnnouncement {
            room: self.room.clone(),
            identity: self.identity.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message)?;
        self.client
            .publish(subjects::leave(&self.room), payload.into())
            .await
            .context("Failed to announce leave")?;
        self.client.flush().await.context("Failed to flush NATS")?;

        info!("Left room {}", self.room);
        Ok(())
    }
}

impl Drop for NatsRoomConnection {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}
