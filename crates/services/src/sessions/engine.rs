use std::sync::Arc;

use prep_core::model::{
    AnswerLetter, AnswerRecord, Question, Screen, SessionAction, SessionId, SessionState,
    TestDefinition,
};
use storage::repository::SessionStatus;

use super::backend::{ResponseSubmission, SessionBackend};
use super::delay::TransitionDelay;
use crate::config::EngineConfig;
use crate::error::{BackendError, SessionError};

/// Drives one learner's attempt at a test.
///
/// Every operation returns a snapshot of the resulting [`SessionState`].
/// Actions that are not allowed in the current state are ignored and return
/// the unchanged snapshot. Actions whose backend call fails leave the state as
/// it was, apart from a pending error and a paused timer.
pub struct SessionEngine {
    test: Arc<TestDefinition>,
    backend: Arc<dyn SessionBackend>,
    delay: Arc<dyn TransitionDelay>,
    config: EngineConfig,
    state: SessionState,
}

impl SessionEngine {
    #[must_use]
    pub fn new(
        test: Arc<TestDefinition>,
        backend: Arc<dyn SessionBackend>,
        delay: Arc<dyn TransitionDelay>,
    ) -> Self {
        let state = SessionState::welcome(test.question_count(), test.seconds_per_question());
        Self {
            test,
            backend,
            delay,
            config: EngineConfig::default(),
            state,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Question shown for the current index, `None` before the start.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.state.screen() == Screen::Welcome {
            return None;
        }
        self.test.question(self.state.current_question_index())
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────────
    //

    /// Create or resume the backend session and enter `in_progress`.
    ///
    /// Calling it again after a successful start returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Init` when the backend cannot open a session and
    /// `SessionError::InvalidResume` when the saved progress does not fit the
    /// test. The engine stays on the welcome screen in both cases.
    pub async fn start(&mut self) -> Result<SessionState, SessionError> {
        if self.state.screen() != Screen::Welcome {
            return Ok(self.snapshot());
        }

        let handle = self
            .backend
            .init_or_resume_session(self.test.slug())
            .await
            .map_err(|err| {
                tracing::warn!(test = self.test.slug(), error = %err, "session init failed");
                SessionError::Init(err)
            })?;

        let mut staged = self.state.clone();
        staged.begin(
            handle.session_id,
            handle.current_question_index.unwrap_or(0),
            handle.answers,
        )?;
        self.state = staged;

        tracing::info!(
            test = self.test.slug(),
            session_id = %handle.session_id,
            resumed = handle.existing,
            question_index = self.state.current_question_index(),
            "session started"
        );
        Ok(self.snapshot())
    }

    /// Lock option `option_index` as the answer to the current question.
    pub async fn select_option(&mut self, option_index: usize) -> SessionState {
        let action = SessionAction::SelectOption;
        let letter = match AnswerLetter::from_index(option_index) {
            Ok(letter) => letter,
            Err(err) => return self.reject(action, &err),
        };
        let Some((session_id, question)) = self.current() else {
            return self.reject(action, &"no active question");
        };
        let (question_id, correct_answer) = (question.id(), question.correct_answer());

        let record = AnswerRecord::answered(
            letter,
            letter == correct_answer,
            self.state.elapsed_on_current(),
        );
        let mut staged = self.state.clone();
        if let Err(err) = staged.lock_answer(option_index, record) {
            return self.reject(action, &err);
        }

        let submission = ResponseSubmission::from_answer(question_id, &record);
        if let Err(err) = self.backend.record_response(session_id, &submission).await {
            return self.fail(action, &err);
        }
        self.commit(staged)
    }

    /// Skip the current question. On the last question this submits.
    pub async fn skip(&mut self) -> SessionState {
        let time_spent = self.state.elapsed_on_current();
        self.skip_with(time_spent, SessionAction::Skip).await
    }

    /// Move on after an answer has been locked.
    pub async fn next(&mut self) -> SessionState {
        let action = SessionAction::Next;
        if !self.state.is_locked() || self.state.is_last_question() {
            return self.reject(action, &"next needs a locked answer before the last question");
        }
        let staged = self.state.clone();
        self.advance(staged, action).await
    }

    /// Finish the attempt once the last question is answered.
    ///
    /// Submitting again on the results screen returns the same snapshot.
    pub async fn submit(&mut self) -> SessionState {
        let action = SessionAction::Submit;
        if self.state.is_complete() {
            return self.snapshot();
        }
        if !self.state.is_locked() || !self.state.is_last_question() {
            return self.reject(action, &"submit needs a locked answer on the last question");
        }
        let staged = self.state.clone();
        self.complete(staged, action).await
    }

    /// One second of wall time.
    ///
    /// Counts a pending error down first; while it is visible the question
    /// timer stays paused. A countdown reaching zero runs the timeout.
    pub async fn tick(&mut self) -> SessionState {
        if !self.state.is_in_progress() {
            return self.snapshot();
        }
        if self.state.error().is_some() {
            if self.state.tick_error() {
                self.state.resume_timer();
            }
            return self.snapshot();
        }
        if self.state.timer_paused() {
            return self.snapshot();
        }
        // A zero left over from a failed timeout retries it.
        if self.state.time_left() == 0 || self.state.tick_down() {
            return self.timeout().await;
        }
        self.snapshot()
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    async fn timeout(&mut self) -> SessionState {
        let action = SessionAction::Timeout;
        tracing::debug!(
            question_index = self.state.current_question_index(),
            locked = self.state.is_locked(),
            "question timed out"
        );
        if self.state.is_locked() {
            let staged = self.state.clone();
            return self.move_forward(staged, action).await;
        }
        let time_spent = self.state.seconds_per_question();
        self.skip_with(time_spent, action).await
    }

    async fn skip_with(&mut self, time_spent: u32, action: SessionAction) -> SessionState {
        let Some((session_id, question)) = self.current() else {
            return self.reject(action, &"no active question");
        };
        let question_id = question.id();

        let mut staged = self.state.clone();
        if let Err(err) = staged.record_skip(time_spent) {
            return self.reject(action, &err);
        }

        let submission =
            ResponseSubmission::from_answer(question_id, &AnswerRecord::skipped(time_spent));
        if let Err(err) = self.backend.record_response(session_id, &submission).await {
            return self.fail(action, &err);
        }
        self.move_forward(staged, action).await
    }

    async fn move_forward(&mut self, staged: SessionState, action: SessionAction) -> SessionState {
        if staged.is_last_question() {
            self.complete(staged, action).await
        } else {
            self.advance(staged, action).await
        }
    }

    async fn advance(&mut self, mut staged: SessionState, action: SessionAction) -> SessionState {
        let Some(session_id) = staged.session_id() else {
            return self.reject(action, &"session has not started");
        };
        let next_index = staged.current_question_index() + 1;

        staged.pause_timer();
        self.delay.wait().await;

        if let Err(err) = self
            .backend
            .update_progress(session_id, next_index, SessionStatus::InProgress)
            .await
        {
            return self.fail(action, &err);
        }
        if let Err(err) = staged.advance() {
            return self.reject(action, &err);
        }
        self.commit(staged)
    }

    async fn complete(&mut self, mut staged: SessionState, action: SessionAction) -> SessionState {
        let Some(session_id) = staged.session_id() else {
            return self.reject(action, &"session has not started");
        };
        staged.pause_timer();

        match self.backend.complete_session(session_id).await {
            Ok(summary) => {
                tracing::info!(
                    session_id = %session_id,
                    correct = summary.correct,
                    answered = summary.answered,
                    skipped = summary.skipped,
                    accuracy = summary.accuracy,
                    "session completed"
                );
                staged.finish(summary);
                self.state = staged;
                self.snapshot()
            }
            Err(err) => self.fail(action, &err),
        }
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn current(&self) -> Option<(SessionId, &Question)> {
        if !self.state.is_in_progress() {
            return None;
        }
        let session_id = self.state.session_id()?;
        let question = self.test.question(self.state.current_question_index())?;
        Some((session_id, question))
    }

    fn commit(&mut self, mut staged: SessionState) -> SessionState {
        staged.clear_error();
        staged.resume_timer();
        self.state = staged;
        self.snapshot()
    }

    fn reject(&self, action: SessionAction, reason: &dyn std::fmt::Display) -> SessionState {
        tracing::debug!(
            action = action.as_str(),
            screen = ?self.state.screen(),
            question_index = self.state.current_question_index(),
            %reason,
            "action ignored"
        );
        self.snapshot()
    }

    fn fail(&mut self, action: SessionAction, err: &BackendError) -> SessionState {
        tracing::warn!(
            action = action.as_str(),
            session_id = ?self.state.session_id(),
            question_index = self.state.current_question_index(),
            error = %err,
            "session action failed"
        );
        self.state.set_error(
            action,
            format!("could not {}: {err}", action.as_str()),
            self.config.error_clear_secs,
        );
        self.snapshot()
    }
}

