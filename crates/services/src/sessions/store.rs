use std::sync::Arc;

use async_trait::async_trait;

use prep_core::model::{AnswerRecord, SessionId, TestDefinition};
use prep_core::scoring::{ScoringError, answers_in_test_order};
use prep_core::{Clock, ResultsSummary};
use storage::repository::{
    ResponseRecord, ResponseRepository, SessionRecord, SessionRepository, SessionStatus, Storage,
    StorageError,
};

use super::backend::{ResponseSubmission, SessionBackend, SessionHandle};
use crate::error::BackendError;

/// `SessionBackend` over the storage repositories for a single test.
///
/// Results are always recomputed from the stored responses, so completing
/// twice yields the same summary.
#[derive(Clone)]
pub struct StoreBackend {
    clock: Clock,
    test: Arc<TestDefinition>,
    sessions: Arc<dyn SessionRepository>,
    responses: Arc<dyn ResponseRepository>,
}

impl StoreBackend {
    #[must_use]
    pub fn new(
        clock: Clock,
        test: Arc<TestDefinition>,
        sessions: Arc<dyn SessionRepository>,
        responses: Arc<dyn ResponseRepository>,
    ) -> Self {
        Self {
            clock,
            test,
            sessions,
            responses,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, test: Arc<TestDefinition>, storage: &Storage) -> Self {
        Self::new(
            clock,
            test,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.responses),
        )
    }

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    /// Summary of a session that has already been completed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotCompleted` for sessions still in progress,
    /// `BackendError::UnknownTest` for sessions of another test, and storage or
    /// scoring errors otherwise.
    pub async fn load_results(&self, session_id: SessionId) -> Result<ResultsSummary, BackendError> {
        let record = self.own_session(session_id).await?;
        if !record.is_completed() {
            return Err(BackendError::NotCompleted(session_id));
        }
        self.summary_for(session_id).await
    }

    async fn own_session(&self, session_id: SessionId) -> Result<SessionRecord, BackendError> {
        let record = self.sessions.get_session(session_id).await?;
        if record.test_slug != self.test.slug() {
            return Err(BackendError::UnknownTest {
                expected: self.test.slug().to_owned(),
                found: record.test_slug,
            });
        }
        Ok(record)
    }

    async fn summary_for(&self, session_id: SessionId) -> Result<ResultsSummary, BackendError> {
        let answers = self.stored_answers(session_id).await?;
        Ok(ResultsSummary::compute(&self.test, &answers)?)
    }

    async fn stored_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerRecord>, BackendError> {
        let responses = self.responses.list_responses(session_id).await?;
        Ok(answers_in_test_order(
            &self.test,
            responses.iter().map(|r| (r.question_id, r.to_answer())),
        )?)
    }

    fn question_count(&self) -> u32 {
        u32::try_from(self.test.question_count()).unwrap_or(u32::MAX)
    }
}

#[async_trait]
impl SessionBackend for StoreBackend {
    async fn init_or_resume_session(
        &self,
        test_slug: &str,
    ) -> Result<SessionHandle, BackendError> {
        if test_slug != self.test.slug() {
            return Err(BackendError::UnknownTest {
                expected: self.test.slug().to_owned(),
                found: test_slug.to_owned(),
            });
        }

        if let Some(open) = self.sessions.find_open_session(test_slug).await? {
            if open.question_count == self.question_count() {
                match self.stored_answers(open.id).await {
                    Ok(answers) => {
                        tracing::debug!(session_id = %open.id, "found open session");
                        return Ok(SessionHandle {
                            session_id: open.id,
                            existing: true,
                            current_question_index: Some(open.current_question_index as usize),
                            answers: Some(answers),
                        });
                    }
                    Err(BackendError::Scoring(err)) => tracing::warn!(
                        session_id = %open.id,
                        error = %err,
                        "open session answers do not fit the test; starting over"
                    ),
                    Err(err) => return Err(err),
                }
            } else {
                tracing::warn!(
                    session_id = %open.id,
                    stored = open.question_count,
                    current = self.question_count(),
                    "open session does not match the test's question count; starting over"
                );
            }
        }

        let record = SessionRecord::start(
            SessionId::generate(),
            test_slug,
            self.question_count(),
            self.clock.now(),
        );
        self.sessions.create_session(&record).await?;
        Ok(SessionHandle::fresh(record.id))
    }

    async fn record_response(
        &self,
        session_id: SessionId,
        response: &ResponseSubmission,
    ) -> Result<(), BackendError> {
        let record = self.own_session(session_id).await?;
        if record.is_completed() {
            return Err(StorageError::Conflict.into());
        }
        if self.test.position_of(response.question_id).is_none() {
            return Err(ScoringError::UnknownQuestion(response.question_id).into());
        }

        let row = ResponseRecord::from_answer(
            session_id,
            response.question_id,
            &response.answer(),
            self.clock.now(),
        );
        self.responses.upsert_response(&row).await?;
        Ok(())
    }

    async fn update_progress(
        &self,
        session_id: SessionId,
        current_question_index: usize,
        status: SessionStatus,
    ) -> Result<(), BackendError> {
        if current_question_index >= self.test.question_count() {
            return Err(BackendError::IndexOutOfRange(current_question_index));
        }
        let index = u32::try_from(current_question_index)
            .map_err(|_| BackendError::IndexOutOfRange(current_question_index))?;
        self.sessions
            .update_progress(session_id, index, status, self.clock.now())
            .await?;
        Ok(())
    }

    async fn complete_session(
        &self,
        session_id: SessionId,
    ) -> Result<ResultsSummary, BackendError> {
        self.own_session(session_id).await?;
        let record = self
            .sessions
            .complete_session(session_id, self.clock.now())
            .await?;
        tracing::debug!(
            session_id = %record.id,
            completed_at = ?record.completed_at,
            "session marked completed"
        );
        self.summary_for(session_id).await
    }
}
