use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::report::SessionRecord;

/// Question-boundary events the agent publishes on the progress topic.
///
/// There is no completion event: only the backend session record finishes an
/// interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The agent started asking question `index` (zero-based) of `total`
    QuestionStarted { index: u32, total: u32 },
}

/// Interview progress as confirmed by the backend.
///
/// Never inferred from transcript text. `is_complete` is set only by
/// `apply_record`. `current_index` only moves forward,
/// stays within `0..=total_questions`, and `is_complete` never resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InterviewProgress {
    total_questions: u32,
    current_index: u32,
    is_complete: bool,
}

impl InterviewProgress {
    pub fn new(total_questions: u32) -> Self {
        Self {
            total_questions,
            current_index: 0,
            is_complete: false,
        }
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// Apply a question-boundary event; returns whether anything changed
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        let before = *self;
        match event {
            ProgressEvent::QuestionStarted { index, total } => {
                self.set_total(*total);
                self.advance_to(*index);
            }
        }
        *self != before
    }

    /// Apply the backend's session record; returns whether anything changed
    pub fn apply_record(&mut self, record: &SessionRecord) -> bool {
        let before = *self;
        if let Some(total) = record.num_questions {
            self.set_total(total);
        }
        if let Some(answered) = record.answers_count {
            self.advance_to(answered);
        }
        if record.is_completed() {
            self.complete();
        }
        *self != before
    }

    fn set_total(&mut self, total: u32) {
        if self.is_complete || total == 0 || total == self.total_questions {
            return;
        }
        if total < self.current_index {
            debug!(
                "Ignoring total {} below current question {}",
                total, self.current_index
            );
            return;
        }
        self.total_questions = total;
    }

    fn advance_to(&mut self, index: u32) {
        if self.is_complete {
            return;
        }
        let index = index.min(self.total_questions);
        if index < self.current_index {
            debug!(
                "Ignoring question index {} behind current {}",
                index, self.current_index
            );
            return;
        }
        self.current_index = index;
    }

    fn complete(&mut self) {
        if self.is_complete {
            return;
        }
        info!(
            "Interview complete at question {}/{}",
            self.current_index, self.total_questions
        );
        self.current_index = self.total_questions;
        self.is_complete = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_started_advances() {
        let mut p = InterviewProgress::new(5);
        assert!(p.apply(&ProgressEvent::QuestionStarted { index: 2, total: 5 }));
        assert_eq!(p.current_index(), 2);
        assert!(!p.is_complete());
    }

    #[test]
    fn test_index_never_moves_back() {
        let mut p = InterviewProgress::new(5);
        p.apply(&ProgressEvent::QuestionStarted { index: 3, total: 5 });
        assert!(!p.apply(&ProgressEvent::QuestionStarted { index: 1, total: 5 }));
        assert_eq!(p.current_index(), 3);
    }

    #[test]
    fn test_index_clamped_to_total() {
        let mut p = InterviewProgress::new(3);
        p.apply(&ProgressEvent::QuestionStarted { index: 9, total: 0 });
        assert_eq!(p.current_index(), 3);
        assert_eq!(p.total_questions(), 3);
    }

    #[test]
    fn test_completion_is_monotonic() {
        let mut p = InterviewProgress::new(4);
        let done = SessionRecord {
            status: Some("completed".to_string()),
            ..Default::default()
        };
        assert!(p.apply_record(&done));
        assert!(p.is_complete());
        assert_eq!(p.current_index(), 4);

        // nothing can undo completion
        assert!(!p.apply_record(&done));
        assert!(!p.apply(&ProgressEvent::QuestionStarted { index: 0, total: 10 }));
        let record = SessionRecord {
            status: Some("active".to_string()),
            num_questions: Some(10),
            answers_count: Some(1),
            ..Default::default()
        };
        assert!(!p.apply_record(&record));
        assert!(p.is_complete());
        assert_eq!(p.total_questions(), 4);
    }

    #[test]
    fn test_question_events_never_complete() {
        let mut p = InterviewProgress::new(3);
        p.apply(&ProgressEvent::QuestionStarted { index: 3, total: 3 });
        assert_eq!(p.current_index(), 3);
        assert!(!p.is_complete());
    }

    #[test]
    fn test_apply_record() {
        let mut p = InterviewProgress::default();
        let record = SessionRecord {
            status: Some("active".to_string()),
            num_questions: Some(5),
            answers_count: Some(2),
            ..Default::default()
        };
        assert!(p.apply_record(&record));
        assert_eq!((p.current_index(), p.total_questions()), (2, 5));

        let done = SessionRecord {
            status: Some("completed".to_string()),
            ..record
        };
        assert!(p.apply_record(&done));
        assert!(p.is_complete());
    }

    #[test]
    fn test_progress_event_wire_format() {
        let ev: ProgressEvent =
            serde_json::from_str(r#"{"kind":"question_started","index":1,"total":5}"#).unwrap();
        assert_eq!(ev, ProgressEvent::QuestionStarted { index: 1, total: 5 });
        // completion is not a room event
        assert!(serde_json::from_str::<ProgressEvent>(r#"{"kind":"completed"}"#).is_err());
    }
}
