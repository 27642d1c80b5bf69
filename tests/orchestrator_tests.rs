// Integration tests for the end-to-end interview flow
//
// Credential issuance runs in-process; the room and the report endpoint are
// scripted fakes. Time is paused so report polling completes instantly.

use interview_orchestrator::config::RealtimeConfig;
use interview_orchestrator::report::{PollPolicy, ReportSource, SessionRecord};
use interview_orchestrator::room::transport::{
    DisconnectReason, ParticipantInfo, RoomConnection, RoomEvent, RoomTransport, TextStreamHeader,
};
use interview_orchestrator::room::{AccessIssuer, CredentialProvider, DetachedMedia, RoomCredential};
use interview_orchestrator::session::{
    InteractionMode, Notice, Session, SessionConfig, SessionContext, TerminationReason,
};
use interview_orchestrator::transcript::{SpeakerRole, ATTR_TRANSCRIPTION_FINAL};
use interview_orchestrator::{InterviewOrchestrator, OrchestratorError, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const LOCAL: &str = "Dana-abc123";

/// Room that replays a fixed list of events to the first subscriber
struct ScriptedRoom {
    script: Vec<RoomEvent>,
    connects: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl RoomTransport for ScriptedRoom {
    async fn connect(&self, _url: &str, token: &str) -> anyhow::Result<Box<dyn RoomConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let claims = interview_orchestrator::room::decode_claims(token)?;
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
            room: claims.video.room,
            keep_open: None,
        }))
    }
}

struct ScriptedConnection {
    script: Vec<RoomEvent>,
    room: String,
    keep_open: Option<mpsc::Sender<RoomEvent>>,
}

#[async_trait::async_trait]
impl RoomConnection for ScriptedConnection {
    fn local_identity(&self) -> &str {
        LOCAL
    }

    fn room_name(&self) -> &str {
        &self.room
    }

    async fn subscribe_text_stream(
        &mut self,
        _topic: &str,
    ) -> anyhow::Result<mpsc::Receiver<RoomEvent>> {
        let (tx, rx) = mpsc::channel(self.script.len() + 1);
        for event in self.script.drain(..) {
            tx.try_send(event)?;
        }
        self.keep_open = Some(tx);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> anyhow::Result<()> {
        self.keep_open = None;
        Ok(())
    }
}

struct FailingCredentials;

#[async_trait::async_trait]
impl CredentialProvider for FailingCredentials {
    async fn issue(&self, _session_id: &str, _name: &str) -> Result<RoomCredential> {
        Err(OrchestratorError::Configuration(
            "realtime platform not configured".to_string(),
        ))
    }
}

struct Reports {
    records: Mutex<Vec<SessionRecord>>,
    calls: AtomicUsize,
}

impl Reports {
    /// Returns the records in order, repeating the last one
    fn new(records: Vec<serde_json::Value>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap())
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl ReportSource for Reports {
    async fn fetch_record(&self, _session_id: &str) -> Result<SessionRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        if records.len() > 1 {
            Ok(records.remove(0))
        } else {
            Ok(records[0].clone())
        }
    }
}

fn issuer() -> Arc<AccessIssuer> {
    let cfg = RealtimeConfig {
        url: Some("nats://127.0.0.1:4222".to_string()),
        api_key: Some("APIkey123".to_string()),
        api_secret: Some("a-very-secret-signing-key".to_string()),
        ..Default::default()
    };
    Arc::new(AccessIssuer::from_config(&cfg).unwrap())
}

fn line(id: &str, identity: &str, text: &str) -> Vec<RoomEvent> {
    let mut attributes = HashMap::new();
    attributes.insert(ATTR_TRANSCRIPTION_FINAL.to_string(), "true".to_string());
    vec![
        RoomEvent::TextStreamOpened(TextStreamHeader {
            stream_id: id.to_string(),
            topic: "lk.transcription".to_string(),
            attributes,
            participant: ParticipantInfo::new(identity, ""),
        }),
        RoomEvent::TextStreamChunk {
            stream_id: id.to_string(),
            text: text.to_string(),
        },
        RoomEvent::TextStreamClosed {
            stream_id: id.to_string(),
        },
    ]
}

fn progress(payload: serde_json::Value) -> RoomEvent {
    RoomEvent::Data {
        topic: "interview.progress".to_string(),
        payload: payload.to_string().into_bytes(),
        participant: ParticipantInfo::new("agent-AJ_1", ""),
    }
}

fn completed_record() -> serde_json::Value {
    json!({
        "status": "completed",
        "numQuestions": 3,
        "summary": {"overall_score": 71, "strengths": ["ownership"]}
    })
}

fn orchestrator(
    credentials: Arc<dyn CredentialProvider>,
    room: ScriptedRoom,
    reports: Arc<Reports>,
) -> InterviewOrchestrator {
    InterviewOrchestrator::new(
        credentials,
        Arc::new(room),
        reports,
        SessionConfig::default(),
        PollPolicy::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_voice_session_to_ready_report() {
    let mut script = Vec::new();
    script.push(progress(json!({"kind": "question_started", "index": 0, "total": 3})));
    script.extend(line("s1", "agent-AJ_1", "Walk me through your last project."));
    script.extend(line("s2", LOCAL, "I rebuilt our billing pipeline."));
    script.push(progress(json!({"kind": "question_started", "index": 1, "total": 3})));
    script.push(RoomEvent::Disconnected(DisconnectReason::RoomClosed));

    let connects = Arc::new(AtomicUsize::new(0));
    let room = ScriptedRoom {
        script,
        connects: Arc::clone(&connects),
    };
    let reports = Reports::new(vec![json!({"transcriptLength": 2}), completed_record()]);
    let orch = orchestrator(issuer(), room, reports.clone());

    let mut ctx = SessionContext::new(Session::new("abc123", "interview-"), 3);
    let navigation = orch
        .run(
            &mut ctx,
            "Dana",
            Box::new(DetachedMedia::new()),
            &CancellationToken::new(),
            &CancellationToken::new(),
        )
        .await
        .expect("navigation");

    assert!(navigation.report_ready);
    assert_eq!(navigation.session_id, "abc123");
    assert_eq!(navigation.notice, None);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(reports.calls.load(Ordering::SeqCst), 2);

    let roles: Vec<_> = ctx.transcript().iter().map(|f| f.speaker_role).collect();
    assert_eq!(roles, vec![SpeakerRole::Agent, SpeakerRole::Human]);
    assert_eq!(ctx.mode(), InteractionMode::Voice);
    assert_eq!(
        ctx.termination(),
        Some(&TerminationReason::Remote(DisconnectReason::RoomClosed))
    );
    assert!(ctx.progress().is_complete());
    assert_eq!(ctx.progress().current_index(), 3);
    assert_eq!(ctx.report().summary().map(|s| s.overall_score), Some(71));
}

#[tokio::test(start_paused = true)]
async fn test_credential_failure_falls_back_to_text() {
    let connects = Arc::new(AtomicUsize::new(0));
    let room = ScriptedRoom {
        script: Vec::new(),
        connects: Arc::clone(&connects),
    };
    let reports = Reports::new(vec![json!({"transcriptLength": 4})]);
    let orch = orchestrator(Arc::new(FailingCredentials), room, reports.clone());

    let mut ctx = SessionContext::new(Session::new("abc123", "interview-"), 3);
    let navigation = orch
        .run(
            &mut ctx,
            "Dana",
            Box::new(DetachedMedia::new()),
            &CancellationToken::new(),
            &CancellationToken::new(),
        )
        .await
        .expect("navigation");

    assert_eq!(connects.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.mode(), InteractionMode::TextOnly);
    assert_eq!(
        ctx.notices()[0].message(),
        "Video unavailable, continuing in text mode"
    );

    // Report never finished: navigate anyway with a partial-report banner
    assert!(!navigation.report_ready);
    assert_eq!(navigation.notice, Some(Notice::PartialReport));
    assert_eq!(reports.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn test_leave_still_navigates() {
    let room = ScriptedRoom {
        script: line("s1", "agent-AJ_1", "Hello there"),
        connects: Arc::new(AtomicUsize::new(0)),
    };
    let reports = Reports::new(vec![completed_record()]);
    let orch = orchestrator(issuer(), room, reports);
    let media = DetachedMedia::new();
    let active = media.activity();

    let leave = CancellationToken::new();
    {
        let leave = leave.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            leave.cancel();
        });
    }

    let mut ctx = SessionContext::new(Session::new("abc123", "interview-"), 3);
    let navigation = orch
        .run(&mut ctx, "Dana", Box::new(media), &leave, &CancellationToken::new())
        .await
        .expect("navigation");

    assert!(navigation.report_ready);
    assert_eq!(ctx.termination(), Some(&TerminationReason::LeaveRequested));
    assert_eq!(ctx.transcript().len(), 1);
    assert!(!active.load(Ordering::SeqCst), "media released");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_skips_navigation() {
    let room = ScriptedRoom {
        script: Vec::new(),
        connects: Arc::new(AtomicUsize::new(0)),
    };
    let reports = Reports::new(vec![json!({"transcriptLength": 1})]);
    let orch = orchestrator(issuer(), room, reports);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            cancel.cancel();
        });
    }

    let mut ctx = SessionContext::new(Session::new("abc123", "interview-"), 3);
    let navigation = orch
        .run(
            &mut ctx,
            "Dana",
            Box::new(DetachedMedia::new()),
            &CancellationToken::new(),
            &cancel,
        )
        .await;

    assert!(navigation.is_none());
    assert!(ctx.is_terminated());
}
