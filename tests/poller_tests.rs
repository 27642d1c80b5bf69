// Integration tests for report readiness polling
//
// Time is paused, so the schedule can be asserted exactly: the first poll is
// immediate and the rest follow every interval.

use interview_orchestrator::report::{
    PollPolicy, Readiness, ReportPoller, ReportSource, ReportView, SessionRecord,
};
use interview_orchestrator::{OrchestratorError, Result};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Answers from a script; the last entry repeats once the script runs out
struct ScriptedSource {
    script: Mutex<VecDeque<Result<SessionRecord>>>,
    calls: AtomicU32,
    latency: Duration,
}

impl ScriptedSource {
    fn new(script: Vec<Result<SessionRecord>>) -> Arc<Self> {
        Self::with_latency(script, Duration::ZERO)
    }

    fn with_latency(script: Vec<Result<SessionRecord>>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            latency,
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReportSource for ScriptedSource {
    async fn fetch_record(&self, _session_id: &str) -> Result<SessionRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

fn partial() -> Result<SessionRecord> {
    Ok(serde_json::from_value(json!({"transcriptLength": 5})).unwrap())
}

fn finished() -> Result<SessionRecord> {
    Ok(serde_json::from_value(json!({
        "status": "completed",
        "numQuestions": 5,
        "summary": {
            "overall_score": 82,
            "strengths": ["structured answers"],
            "weaknesses": ["few metrics"],
            "action_plan": ["quantify impact"],
            "suggested_roles": ["Platform Engineer"]
        }
    }))
    .unwrap())
}

fn poller(source: Arc<ScriptedSource>) -> ReportPoller {
    ReportPoller::new(source, PollPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn test_ready_on_tenth_poll() {
    let mut script: Vec<_> = (0..9).map(|_| partial()).collect();
    script.push(finished());
    let source = ScriptedSource::new(script);
    let started = Instant::now();

    let result = poller(source.clone())
        .wait_for_report("abc123", &CancellationToken::new())
        .await;

    match &result.readiness {
        Readiness::Ready(summary) => assert_eq!(summary.overall_score, 82),
        other => panic!("expected ready, got {:?}", other),
    }
    assert_eq!(result.attempts, 10);
    assert_eq!(source.calls(), 10);
    assert_eq!(started.elapsed(), Duration::from_millis(4500));
    assert!(result.last_record.unwrap().is_completed());
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_after_budget() {
    let source = ScriptedSource::new(vec![partial()]);
    let started = Instant::now();

    let result = poller(source.clone())
        .wait_for_report("abc123", &CancellationToken::new())
        .await;

    assert_eq!(
        result.readiness,
        Readiness::NotReady(ReportView::Partial {
            transcript_length: 5
        })
    );
    assert_eq!(source.calls(), 10);
    assert!(started.elapsed() <= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_errors_keep_polling() {
    let source = ScriptedSource::new(vec![
        Err(OrchestratorError::Report("status 503".to_string())),
        Err(OrchestratorError::Report("request failed".to_string())),
        partial(),
        finished(),
    ]);

    let result = poller(source.clone())
        .wait_for_report("abc123", &CancellationToken::new())
        .await;

    assert!(result.is_ready());
    assert_eq!(result.attempts, 4);
}

#[tokio::test(start_paused = true)]
async fn test_slow_endpoint_still_bounded() {
    // Every call takes longer than the whole budget
    let source = ScriptedSource::with_latency(vec![finished()], Duration::from_secs(30));
    let started = Instant::now();

    let result = poller(source.clone())
        .wait_for_report("abc123", &CancellationToken::new())
        .await;

    assert_eq!(result.readiness, Readiness::NotReady(ReportView::Absent));
    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_immediately() {
    let source = ScriptedSource::new(vec![partial()]);
    let cancel = CancellationToken::new();
    let started = Instant::now();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            cancel.cancel();
        });
    }

    let result = poller(source.clone()).wait_for_report("abc123", &cancel).await;

    assert_eq!(result.readiness, Readiness::Cancelled);
    assert_eq!(started.elapsed(), Duration::from_millis(1200));
    // polls at 0ms, 500ms and 1000ms
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_slow_fetch() {
    let source = ScriptedSource::with_latency(vec![partial()], Duration::from_secs(3));
    let cancel = CancellationToken::new();
    let started = Instant::now();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            cancel.cancel();
        });
    }

    let result = poller(source).wait_for_report("abc123", &cancel).await;

    assert_eq!(result.readiness, Readiness::Cancelled);
    assert_eq!(result.attempts, 1);
    assert_eq!(started.elapsed(), Duration::from_millis(700));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start() {
    let source = ScriptedSource::new(vec![partial()]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = poller(source.clone()).wait_for_report("abc123", &cancel).await;

    assert_eq!(result.readiness, Readiness::Cancelled);
    assert_eq!(source.calls(), 0);
}
