use anyhow::Context;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::progress::ProgressEvent;
use crate::room::credential::RoomCredential;
use crate::room::media::LocalMedia;
use crate::room::transport::{DisconnectReason, RoomConnection, RoomEvent, RoomTransport};
use crate::transcript::{SpeakerClass, TranscriptFragment, TranscriptNormalizer};

/// Lifecycle of one monitor instance. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Connecting,
    Connected,
    Leaving,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The local user asked to leave
    LeaveRequested,
    /// The room went away: agent ended the call, peer closed, network loss
    Remote(DisconnectReason),
    /// Joining the room failed; the session continues in text mode
    ConnectFailed(String),
}

/// Events a monitor emits, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { room_name: String },
    Fragment(TranscriptFragment),
    Progress(ProgressEvent),
    /// Non-fatal: the caller should fall back to text-only interaction
    ConnectionFailed { message: String },
    /// Emitted exactly once per monitor
    Terminated(TerminationReason),
}

/// The single event stream of a monitor.
///
/// Handed out once at construction and not cloneable, so there is exactly one
/// consumer per monitor.
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// Already connecting, connected, or finished; nothing was done
    Ignored(LifecycleState),
    /// Join failed; the monitor is terminated
    Failed(String),
    /// A leave arrived while connecting; the monitor is terminated
    Aborted,
}

struct Inner {
    state: LifecycleState,
    connection: Option<Box<dyn RoomConnection>>,
    pump: Option<JoinHandle<()>>,
}

struct Shared {
    credential: RoomCredential,
    config: SessionConfig,
    transport: Arc<dyn RoomTransport>,
    media: Mutex<Box<dyn LocalMedia>>,
    inner: Mutex<Inner>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Owns the one live room connection of a session attempt.
///
/// `connect` is guarded so repeated calls never join twice; any of
/// `request_leave`, a remote disconnect, or a failed join moves the monitor to
/// `Terminated`, which releases local media, stops the transcript
/// subscription, and emits `Terminated` once.
pub struct SessionMonitor {
    shared: Arc<Shared>,
}

impl SessionMonitor {
    pub fn new(
        credential: RoomCredential,
        transport: Arc<dyn RoomTransport>,
        media: Box<dyn LocalMedia>,
        config: SessionConfig,
    ) -> (Self, SessionEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            credential,
            config,
            transport,
            media: Mutex::new(media),
            inner: Mutex::new(Inner {
                state: LifecycleState::Idle,
                connection: None,
                pump: None,
            }),
            cancel: CancellationToken::new(),
            events: tx,
        });
        (Self { shared }, SessionEvents { rx })
    }

    pub fn room_name(&self) -> &str {
        &self.shared.credential.room_name
    }

    pub async fn state(&self) -> LifecycleState {
        self.shared.inner.lock().await.state
    }

    /// Join the room and start consuming transcripts
    pub async fn connect(&self) -> ConnectOutcome {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.state != LifecycleState::Idle {
                debug!("connect() ignored in state {:?}", inner.state);
                return ConnectOutcome::Ignored(inner.state);
            }
            inner.state = LifecycleState::Connecting;
        }

        info!("Connecting to room {}", self.room_name());

        let shared = &self.shared;
        let result = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => None,
            r = Shared::establish(shared) => Some(r),
        };

        if shared.cancel.is_cancelled() {
            info!("Connect to {} interrupted by leave", self.room_name());
            Shared::finish(shared, TerminationReason::LeaveRequested, false).await;
            return ConnectOutcome::Aborted;
        }

        match result {
            Some(Ok(())) => ConnectOutcome::Connected,
            Some(Err(e)) => {
                let message = format!("{:#}", e);
                warn!("Room connection failed, falling back to text mode: {}", message);
                shared.emit(SessionEvent::ConnectionFailed {
                    message: message.clone(),
                });
                Shared::finish(shared, TerminationReason::ConnectFailed(message.clone()), false)
                    .await;
                ConnectOutcome::Failed(message)
            }
            None => ConnectOutcome::Aborted,
        }
    }

    /// Leave the room. Safe in any state; after the first call it is a no-op.
    pub async fn request_leave(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            match inner.state {
                LifecycleState::Leaving | LifecycleState::Terminated => {
                    debug!("request_leave() ignored in state {:?}", inner.state);
                    return;
                }
                LifecycleState::Idle => {}
                LifecycleState::Connecting | LifecycleState::Connected => {
                    inner.state = LifecycleState::Leaving;
                    // an in-flight connect must observe the leave as an abort
                    self.shared.cancel.cancel();
                }
            }
        }

        info!("Leaving room {}", self.room_name());
        Shared::finish(&self.shared, TerminationReason::LeaveRequested, false).await;
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        // Stops the transcript pump; media release needs request_leave()
        self.shared.cancel.cancel();
    }
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("Session event dropped, no consumer");
        }
    }

    async fn establish(shared: &Arc<Shared>) -> anyhow::Result<()> {
        shared
            .media
            .lock()
            .await
            .acquire()
            .await
            .context("Failed to acquire local media")?;

        let mut connection = shared
            .transport
            .connect(&shared.credential.url, &shared.credential.token)
            .await
            .context("Failed to join room")?;

        let room_events = match connection
            .subscribe_text_stream(&shared.config.normalizer.topic)
            .await
        {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(de) = connection.disconnect().await {
                    warn!("Disconnect after failed subscribe: {}", de);
                }
                return Err(e.context("Failed to subscribe to transcript stream"));
            }
        };

        let normalizer =
            TranscriptNormalizer::new(shared.config.normalizer.clone(), connection.local_identity());

        let mut inner = shared.inner.lock().await;
        if inner.state != LifecycleState::Connecting {
            drop(inner);
            if let Err(e) = connection.disconnect().await {
                warn!("Disconnect after aborted connect: {}", e);
            }
            anyhow::bail!("connect aborted");
        }

        let room_name = connection.room_name().to_string();
        inner.pump = Some(tokio::spawn(Shared::pump(
            Arc::clone(shared),
            room_events,
            normalizer,
        )));
        inner.connection = Some(connection);
        inner.state = LifecycleState::Connected;
        drop(inner);

        info!("Connected to room {}", room_name);
        shared.emit(SessionEvent::Connected { room_name });
        Ok(())
    }

    async fn pump(
        shared: Arc<Shared>,
        mut room_events: mpsc::Receiver<RoomEvent>,
        mut normalizer: TranscriptNormalizer,
    ) {
        debug!("Transcript pump started on {}", normalizer.topic());

        loop {
            let event = tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break,
                e = room_events.recv() => e,
            };

            match event {
                None => {
                    warn!("Room event stream ended");
                    Shared::finish(
                        &shared,
                        TerminationReason::Remote(DisconnectReason::ConnectionLost),
                        true,
                    )
                    .await;
                    break;
                }
                Some(RoomEvent::Disconnected(reason)) => {
                    info!("Room disconnected: {:?}", reason);
                    Shared::finish(&shared, TerminationReason::Remote(reason), true).await;
                    break;
                }
                Some(RoomEvent::Data {
                    topic,
                    payload,
                    participant,
                }) => {
                    if topic != shared.config.progress_topic {
                        continue;
                    }
                    // only the agent speaks for the backend
                    if normalizer.classify(&participant) != SpeakerClass::Agent {
                        debug!(
                            "Ignoring progress event from non-agent participant {}",
                            participant.identity
                        );
                        continue;
                    }
                    match serde_json::from_slice::<ProgressEvent>(&payload) {
                        Ok(progress) => shared.emit(SessionEvent::Progress(progress)),
                        Err(e) => debug!("Dropping malformed progress event: {}", e),
                    }
                }
                Some(RoomEvent::ParticipantJoined(p)) => {
                    debug!("Participant joined: {} ({})", p.identity, p.name);
                }
                Some(RoomEvent::ParticipantLeft(p)) => {
                    debug!("Participant left: {} ({})", p.identity, p.name);
                }
                Some(other) => {
                    if let Some(fragment) = normalizer.handle(&other) {
                        shared.emit(SessionEvent::Fragment(fragment));
                    }
                }
            }
        }

        debug!("Transcript pump stopped: {:?}", normalizer.stats());
    }

    /// Move to `Terminated` exactly once and tear everything down.
    ///
    /// `from_pump` is set when the pump itself calls this; it must not wait on
    /// its own handle.
    async fn finish(shared: &Arc<Shared>, reason: TerminationReason, from_pump: bool) -> bool {
        let (connection, pump) = {
            let mut inner = shared.inner.lock().await;
            if inner.state == LifecycleState::Terminated {
                return false;
            }
            inner.state = LifecycleState::Terminated;
            (inner.connection.take(), inner.pump.take())
        };

        shared.cancel.cancel();

        if let Some(pump) = pump {
            if !from_pump {
                if let Err(e) = pump.await {
                    error!("Transcript pump panicked: {}", e);
                }
            }
        }

        if let Some(mut connection) = connection {
            if let Err(e) = connection.disconnect().await {
                warn!("Room disconnect failed: {}", e);
            }
        }

        {
            let mut media = shared.media.lock().await;
            let name = media.name().to_string();
            if let Err(e) = media.release().await {
                warn!("Failed to release local media {}: {}", name, e);
            }
        }

        info!(
            "Session for room {} terminated: {:?}",
            shared.credential.room_name, reason
        );
        shared.emit(SessionEvent::Terminated(reason));
        true
    }
}
