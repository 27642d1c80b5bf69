use serde::Serialize;
use tracing::{info, warn};

use super::monitor::{SessionEvent, TerminationReason};
use super::progress::InterviewProgress;
use crate::report::ReportView;
use crate::room::naming;
use crate::transcript::TranscriptFragment;

/// One interview session, as known before any room is joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub session_id: String,
    pub room_name: String,
}

impl Session {
    pub fn new(session_id: impl Into<String>, room_prefix: &str) -> Self {
        let session_id = session_id.into();
        let room_name = naming::room_name(room_prefix, &session_id);
        Self {
            session_id,
            room_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Voice,
    TextOnly,
}

/// User-facing notices raised during a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Credential or room join failed; the interview continues as text
    VideoUnavailable { reason: String },
    /// The report was not final when polling gave up
    PartialReport,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::VideoUnavailable { .. } => "Video unavailable, continuing in text mode",
            Notice::PartialReport => "Your report is still being prepared",
        }
    }
}

/// Everything the client shows for one session.
///
/// Fed by `SessionEvent`s from the monitor and by report polling.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    session: Session,
    progress: InterviewProgress,
    transcript: Vec<TranscriptFragment>,
    mode: InteractionMode,
    notices: Vec<Notice>,
    #[serde(skip)]
    report: ReportView,
    #[serde(skip)]
    termination: Option<TerminationReason>,
}

impl SessionContext {
    pub fn new(session: Session, total_questions: u32) -> Self {
        Self {
            session,
            progress: InterviewProgress::new(total_questions),
            transcript: Vec::new(),
            mode: InteractionMode::Voice,
            notices: Vec::new(),
            report: ReportView::Absent,
            termination: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn progress(&self) -> &InterviewProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut InterviewProgress {
        &mut self.progress
    }

    /// Visible transcript in arrival order
    pub fn transcript(&self) -> &[TranscriptFragment] {
        &self.transcript
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn report(&self) -> &ReportView {
        &self.report
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    /// Apply one monitor event
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected { room_name } => {
                if room_name != &self.session.room_name {
                    warn!(
                        "Connected to {} but session expects {}",
                        room_name, self.session.room_name
                    );
                }
            }
            SessionEvent::Fragment(fragment) => self.transcript.push(fragment.clone()),
            SessionEvent::Progress(progress) => {
                self.progress.apply(progress);
            }
            SessionEvent::ConnectionFailed { message } => self.degrade_to_text(message),
            SessionEvent::Terminated(reason) => {
                if self.termination.is_none() {
                    self.termination = Some(reason.clone());
                }
            }
        }
    }

    /// Switch to text-only interaction and tell the user once
    pub fn degrade_to_text(&mut self, reason: &str) {
        if self.mode == InteractionMode::TextOnly {
            return;
        }
        info!(
            "Session {} continuing in text mode: {}",
            self.session.session_id, reason
        );
        self.mode = InteractionMode::TextOnly;
        self.notices.push(Notice::VideoUnavailable {
            reason: reason.to_string(),
        });
    }

    pub fn record_report(&mut self, view: ReportView) {
        if self.report.is_final() && !view.is_final() {
            return;
        }
        self.report = view;
    }

    pub fn push_notice(&mut self, notice: Notice) {
        if !self.notices.contains(&notice) {
            self.notices.push(notice);
        }
    }
}
