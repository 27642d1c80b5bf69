use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::report::{PollPolicy, Readiness, ReportPoller, ReportSource, ReportView};
use crate::room::{CredentialProvider, LocalMedia, RoomTransport};
use crate::session::{
    Notice, SessionConfig, SessionContext, SessionEvent, SessionEvents, SessionMonitor,
    TerminationReason,
};

/// Where the client goes once the interview is over
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub session_id: String,
    pub report_ready: bool,
    /// Shown as a banner on the report view
    pub notice: Option<Notice>,
}

/// Drives one interview from credential issuance to report navigation
pub struct InterviewOrchestrator {
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn RoomTransport>,
    reports: Arc<dyn ReportSource>,
    session_config: SessionConfig,
    poll_policy: PollPolicy,
}

impl InterviewOrchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn RoomTransport>,
        reports: Arc<dyn ReportSource>,
        session_config: SessionConfig,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            credentials,
            transport,
            reports,
            session_config,
            poll_policy,
        }
    }

    pub fn from_config(
        cfg: &Config,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn RoomTransport>,
        reports: Arc<dyn ReportSource>,
    ) -> Self {
        Self::new(
            credentials,
            transport,
            reports,
            SessionConfig::from_config(cfg),
            PollPolicy::from_config(&cfg.report),
        )
    }

    /// Obtain a credential and build the monitor for this session.
    ///
    /// Returns `None` after switching the context to text mode when no usable
    /// credential could be obtained.
    pub async fn prepare(
        &self,
        ctx: &mut SessionContext,
        participant_name: &str,
        media: Box<dyn LocalMedia>,
    ) -> Option<(SessionMonitor, SessionEvents)> {
        let session_id = ctx.session().session_id.clone();

        let credential = match self.credentials.issue(&session_id, participant_name).await {
            Ok(c) => c,
            Err(e) => {
                warn!("No room credential for session {}: {}", session_id, e);
                ctx.degrade_to_text(&e.to_string());
                return None;
            }
        };

        if credential.room_name != ctx.session().room_name {
            let reason = format!(
                "credential names room {}, session expects {}",
                credential.room_name,
                ctx.session().room_name
            );
            warn!("{}", reason);
            ctx.degrade_to_text(&reason);
            return None;
        }

        Some(SessionMonitor::new(
            credential,
            Arc::clone(&self.transport),
            media,
            self.session_config.clone(),
        ))
    }

    /// Fold monitor events into the context until the session terminates
    pub async fn follow(
        &self,
        ctx: &mut SessionContext,
        events: &mut SessionEvents,
    ) -> Option<TerminationReason> {
        while let Some(event) = events.next().await {
            ctx.apply(&event);
            if let SessionEvent::Terminated(reason) = event {
                return Some(reason);
            }
        }
        warn!("Session event stream closed before termination");
        None
    }

    /// Wait for the report and decide where to navigate.
    ///
    /// Returns `None` when cancelled; the caller has moved on.
    pub async fn finish(
        &self,
        ctx: &mut SessionContext,
        cancel: &CancellationToken,
    ) -> Option<Navigation> {
        let session_id = ctx.session().session_id.clone();
        let poller = ReportPoller::new(Arc::clone(&self.reports), self.poll_policy);
        let result = poller.wait_for_report(&session_id, cancel).await;

        if let Some(record) = &result.last_record {
            ctx.progress_mut().apply_record(record);
        }

        let navigation = match result.readiness {
            Readiness::Cancelled => return None,
            Readiness::Ready(summary) => {
                ctx.record_report(ReportView::Final(summary));
                Navigation {
                    session_id,
                    report_ready: true,
                    notice: None,
                }
            }
            Readiness::NotReady(view) => {
                ctx.record_report(view);
                ctx.push_notice(Notice::PartialReport);
                Navigation {
                    session_id,
                    report_ready: false,
                    notice: Some(Notice::PartialReport),
                }
            }
        };

        info!(
            "Navigating to report for session {} (ready={})",
            navigation.session_id, navigation.report_ready
        );
        Some(navigation)
    }

    /// Full voice session: join, follow until termination, then poll.
    ///
    /// Falls through to polling in text mode when the room is unavailable.
    /// `leave` ends the room session and still polls for the report;
    /// `cancel` ends the room session and skips navigation.
    pub async fn run(
        &self,
        ctx: &mut SessionContext,
        participant_name: &str,
        media: Box<dyn LocalMedia>,
        leave: &CancellationToken,
        cancel: &CancellationToken,
    ) -> Option<Navigation> {
        if let Some((monitor, mut events)) = self.prepare(ctx, participant_name, media).await {
            let monitor = Arc::new(monitor);
            let leave_watch = {
                let monitor = Arc::clone(&monitor);
                let leave = leave.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = leave.cancelled() => {}
                        _ = cancel.cancelled() => {}
                    }
                    monitor.request_leave().await;
                })
            };

            monitor.connect().await;
            self.follow(ctx, &mut events).await;
            leave_watch.abort();
        }

        if cancel.is_cancelled() {
            return None;
        }
        self.finish(ctx, cancel).await
    }
}
