use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scored interview report compiled by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSummary {
    /// 0 to 100
    pub overall_score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub action_plan: Vec<String>,
    #[serde(default)]
    pub suggested_roles: Vec<String>,
}

/// What the report endpoint currently shows for a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReportView {
    /// No transcript persisted yet
    #[default]
    Absent,
    /// Transcript persisted, score not computed yet
    Partial { transcript_length: u32 },
    Final(InterviewSummary),
}

impl ReportView {
    pub fn is_final(&self) -> bool {
        matches!(self, ReportView::Final(_))
    }

    pub fn summary(&self) -> Option<&InterviewSummary> {
        match self {
            ReportView::Final(s) => Some(s),
            _ => None,
        }
    }
}

/// Session record returned by the report endpoint
///
/// Every field is optional; the endpoint answers with whatever the backend has
/// persisted so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, alias = "numQuestions")]
    pub num_questions: Option<u32>,

    #[serde(default, alias = "answersCount")]
    pub answers_count: Option<u32>,

    #[serde(default, alias = "transcriptLength")]
    pub transcript_length: Option<u32>,

    #[serde(default)]
    pub summary: Option<serde_json::Value>,
}

impl SessionRecord {
    pub fn is_completed(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("completed"))
            .unwrap_or(false)
    }

    /// Interpret the record as a report view.
    ///
    /// A missing or null `summary` means not ready regardless of anything
    /// else in the record. A summary that does not decode is treated the same.
    pub fn view(&self) -> ReportView {
        if let Some(raw) = self.summary.as_ref().filter(|v| !v.is_null()) {
            match serde_json::from_value::<InterviewSummary>(raw.clone()) {
                Ok(summary) if summary.overall_score <= 100 => return ReportView::Final(summary),
                Ok(summary) => debug!("Ignoring summary with score {}", summary.overall_score),
                Err(e) => debug!("Ignoring undecodable summary: {}", e),
            }
        }

        match self.transcript_length {
            Some(n) if n > 0 => ReportView::Partial { transcript_length: n },
            _ => ReportView::Absent,
        }
    }
}
