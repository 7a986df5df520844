use async_trait::async_trait;

use prep_core::ResultsSummary;
use prep_core::model::{AnswerLetter, AnswerRecord, AnswerStatus, QuestionId, SessionId};
use storage::repository::SessionStatus;

use crate::error::BackendError;

/// What the backend knows about a session when a learner opens a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: SessionId,
    /// True when an in-progress session was found and is being resumed.
    pub existing: bool,
    pub current_question_index: Option<usize>,
    /// Saved answers in test order, present on resume.
    pub answers: Option<Vec<AnswerRecord>>,
}

impl SessionHandle {
    #[must_use]
    pub fn fresh(session_id: SessionId) -> Self {
        Self {
            session_id,
            existing: false,
            current_question_index: None,
            answers: None,
        }
    }
}

/// One answer or skip event as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSubmission {
    pub question_id: QuestionId,
    pub selected_answer: Option<AnswerLetter>,
    pub is_correct: bool,
    pub time_spent_secs: u32,
    pub is_skipped: bool,
}

impl ResponseSubmission {
    #[must_use]
    pub fn from_answer(question_id: QuestionId, answer: &AnswerRecord) -> Self {
        Self {
            question_id,
            selected_answer: answer.selected_answer,
            is_correct: answer.status == AnswerStatus::Correct,
            time_spent_secs: answer.time_spent,
            is_skipped: answer.status == AnswerStatus::Skipped,
        }
    }

    /// The answer entry this event stands for.
    #[must_use]
    pub fn answer(&self) -> AnswerRecord {
        match (self.is_skipped, self.selected_answer) {
            (false, Some(letter)) => {
                AnswerRecord::answered(letter, self.is_correct, self.time_spent_secs)
            }
            _ => AnswerRecord::skipped(self.time_spent_secs),
        }
    }
}

/// Persistence collaborator of the session engine.
///
/// Implementations decide the transport; the engine only relies on this
/// contract.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Create a new attempt for `test_slug`, or return the one in progress.
    async fn init_or_resume_session(&self, test_slug: &str)
    -> Result<SessionHandle, BackendError>;

    /// Durably record one answer or skip. Calling it again for the same
    /// question replaces the earlier record.
    async fn record_response(
        &self,
        session_id: SessionId,
        response: &ResponseSubmission,
    ) -> Result<(), BackendError>;

    /// Move the resume point.
    async fn update_progress(
        &self,
        session_id: SessionId,
        current_question_index: usize,
        status: SessionStatus,
    ) -> Result<(), BackendError>;

    /// Finalize the session and return its results. Idempotent.
    async fn complete_session(&self, session_id: SessionId)
    -> Result<ResultsSummary, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_maps_back_to_its_answer() {
        let id = QuestionId::new(7);
        for answer in [
            AnswerRecord::answered(AnswerLetter::C, false, 12),
            AnswerRecord::answered(AnswerLetter::A, true, 3),
            AnswerRecord::skipped(30),
        ] {
            assert_eq!(ResponseSubmission::from_answer(id, &answer).answer(), answer);
        }
    }
}
