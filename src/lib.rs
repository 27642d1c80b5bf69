pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod orchestrator;
pub mod report;
pub mod room;
pub mod session;
pub mod transcript;

pub use audio::{AudioFrame, CapturedAudio, SilenceDetector, StopReason};
pub use config::Config;
pub use error::{OrchestratorError, Result};
pub use http::{create_router, AppState};
pub use nats::{NatsRoomConnection, NatsRoomTransport};
pub use orchestrator::{InterviewOrchestrator, Navigation};
pub use report::{
    HttpReportClient, InterviewSummary, PollPolicy, PollResult, Readiness, ReportPoller,
    ReportSource, ReportView, SessionRecord,
};
pub use room::{
    AccessIssuer, CredentialProvider, DetachedMedia, HttpCredentialClient, LocalMedia,
    RoomCredential, RoomTransport,
};
pub use session::{
    ConnectOutcome, InteractionMode, InterviewProgress, LifecycleState, Notice, ProgressEvent,
    Session, SessionConfig, SessionContext, SessionEvent, SessionEvents, SessionMonitor,
    TerminationReason,
};
pub use transcript::{SpeakerRole, TranscriptFragment, TranscriptNormalizer};
