use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::ReportSource;
use super::view::{InterviewSummary, ReportView, SessionRecord};
use crate::config::ReportConfig;

/// Fixed-interval, bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn from_config(cfg: &ReportConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.poll_interval_ms),
            max_attempts: cfg.max_attempts.max(1),
        }
    }

    /// Hard wall-clock bound on one polling run
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready(InterviewSummary),
    /// Budget exhausted; carries the last view seen
    NotReady(ReportView),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    pub readiness: Readiness,
    /// Endpoint calls made, including failed ones
    pub attempts: u32,
    /// Last record the endpoint returned successfully
    pub last_record: Option<SessionRecord>,
}

impl PollResult {
    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }
}

/// Waits for the backend to finish compiling a report.
///
/// The first call goes out immediately and the following ones on a fixed
/// schedule. Errors and partial records keep polling. The run always ends
/// within `interval * max_attempts`, and at once when cancelled.
pub struct ReportPoller {
    source: Arc<dyn ReportSource>,
    policy: PollPolicy,
}

impl ReportPoller {
    pub fn new(source: Arc<dyn ReportSource>, policy: PollPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub async fn wait_for_report(&self, session_id: &str, cancel: &CancellationToken) -> PollResult {
        let started = Instant::now();
        let deadline = started + self.policy.budget();
        let mut attempts = 0;
        let mut last_view = ReportView::Absent;
        let mut last_record = None;

        info!(
            "Polling report for session {} (every {:?}, up to {} attempts)",
            session_id, self.policy.interval, self.policy.max_attempts
        );

        while attempts < self.policy.max_attempts {
            if attempts > 0 {
                let next = (started + self.policy.interval * attempts).min(deadline);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return self.cancelled(session_id, attempts, last_record);
                    }
                    _ = sleep_until(next) => {}
                }
            }

            attempts += 1;
            let fetch = timeout_at(deadline, self.source.fetch_record(session_id));
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancelled(session_id, attempts, last_record);
                }
                r = fetch => r,
            };

            match response {
                Err(_) => {
                    warn!("Report poll {} hit the polling deadline", attempts);
                    break;
                }
                Ok(Err(e)) => {
                    debug!("Report poll {} failed: {}", attempts, e);
                }
                Ok(Ok(record)) => {
                    let view = record.view();
                    last_record = Some(record);
                    match view {
                        ReportView::Final(summary) => {
                            info!(
                                "Report for session {} ready after {} attempts (score {})",
                                session_id, attempts, summary.overall_score
                            );
                            return PollResult {
                                readiness: Readiness::Ready(summary),
                                attempts,
                                last_record,
                            };
                        }
                        other => {
                            debug!("Report poll {}: {:?}", attempts, other);
                            last_view = other;
                        }
                    }
                }
            }
        }

        info!(
            "Report for session {} not ready after {} attempts",
            session_id, attempts
        );
        PollResult {
            readiness: Readiness::NotReady(last_view),
            attempts,
            last_record,
        }
    }

    fn cancelled(
        &self,
        session_id: &str,
        attempts: u32,
        last_record: Option<SessionRecord>,
    ) -> PollResult {
        info!("Report polling for session {} cancelled", session_id);
        PollResult {
            readiness: Readiness::Cancelled,
            attempts,
            last_record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_budget() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.budget(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let cfg = ReportConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(PollPolicy::from_config(&cfg).max_attempts, 1);
    }
}
