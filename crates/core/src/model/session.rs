use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answer::AnswerLetter;
use crate::model::ids::SessionId;
use crate::scoring::ResultsSummary;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session is not in progress")]
    NotInProgress,

    #[error("an answer is already locked for question {index}")]
    AnswerLocked { index: usize },

    #[error("question {index} is the last question")]
    NoNextQuestion { index: usize },

    #[error("resume index {index} is outside a test of {count} questions")]
    ResumeIndexOutOfRange { index: usize, count: usize },

    #[error("resume carried {len} answers for a test of {count} questions")]
    AnswerCountMismatch { len: usize, count: usize },
}

//
// ─── SCREEN & ANSWERS ──────────────────────────────────────────────────────────
//

/// Which part of the attempt is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    InProgress,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Unanswered,
    Skipped,
    Correct,
    Wrong,
}

impl AnswerStatus {
    /// True for statuses that carry a locked-in option.
    #[must_use]
    pub fn is_answered(self) -> bool {
        matches!(self, AnswerStatus::Correct | AnswerStatus::Wrong)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerStatus::Unanswered => "unanswered",
            AnswerStatus::Skipped => "skipped",
            AnswerStatus::Correct => "correct",
            AnswerStatus::Wrong => "wrong",
        }
    }
}

/// Outcome recorded for one question of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub status: AnswerStatus,
    pub selected_answer: Option<AnswerLetter>,
    pub time_spent: u32,
}

impl AnswerRecord {
    #[must_use]
    pub fn unanswered() -> Self {
        Self {
            status: AnswerStatus::Unanswered,
            selected_answer: None,
            time_spent: 0,
        }
    }

    #[must_use]
    pub fn skipped(time_spent: u32) -> Self {
        Self {
            status: AnswerStatus::Skipped,
            selected_answer: None,
            time_spent,
        }
    }

    #[must_use]
    pub fn answered(letter: AnswerLetter, correct: bool, time_spent: u32) -> Self {
        Self {
            status: if correct {
                AnswerStatus::Correct
            } else {
                AnswerStatus::Wrong
            },
            selected_answer: Some(letter),
            time_spent,
        }
    }
}

impl Default for AnswerRecord {
    fn default() -> Self {
        Self::unanswered()
    }
}

/// Which actions the learner may trigger right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButtons {
    pub skip: bool,
    pub next: bool,
    pub submit: bool,
}

//
// ─── ERRORS SHOWN TO THE LEARNER ───────────────────────────────────────────────
//

/// Engine operation an [`ActionError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    SelectOption,
    Skip,
    Next,
    Submit,
    Timeout,
}

impl SessionAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionAction::SelectOption => "select option",
            SessionAction::Skip => "skip",
            SessionAction::Next => "next",
            SessionAction::Submit => "submit",
            SessionAction::Timeout => "timeout",
        }
    }
}

/// Recoverable failure of a single action.
///
/// `clears_in` counts down once per timer tick; the error disappears when it
/// reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub action: SessionAction,
    pub message: String,
    pub clears_in: u32,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Mutable state of one test attempt.
///
/// Values of this type are handed out as snapshots; every mutation goes
/// through a named method that keeps the answer-lock and index invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    session_id: Option<SessionId>,
    screen: Screen,
    seconds_per_question: u32,
    current_question_index: usize,
    selected_option: Option<usize>,
    time_left: u32,
    answers: Vec<AnswerRecord>,
    timer_paused: bool,
    error: Option<ActionError>,
    results: Option<ResultsSummary>,
}

impl SessionState {
    /// State shown before the attempt has started.
    #[must_use]
    pub fn welcome(question_count: usize, seconds_per_question: u32) -> Self {
        Self {
            session_id: None,
            screen: Screen::Welcome,
            seconds_per_question,
            current_question_index: 0,
            selected_option: None,
            time_left: seconds_per_question,
            answers: vec![AnswerRecord::unanswered(); question_count],
            timer_paused: true,
            error: None,
            results: None,
        }
    }

    /// Enter `in_progress`, optionally restoring a saved position and answers.
    ///
    /// A restored current question that already holds a locked answer keeps
    /// that lock. The timer always starts full.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NotInProgress` unless the state is `welcome`,
    /// and the resume errors when the saved data does not fit the test.
    pub fn begin(
        &mut self,
        session_id: SessionId,
        current_question_index: usize,
        answers: Option<Vec<AnswerRecord>>,
    ) -> Result<(), SessionStateError> {
        if self.screen != Screen::Welcome {
            return Err(SessionStateError::NotInProgress);
        }
        let count = self.answers.len();
        if current_question_index >= count {
            return Err(SessionStateError::ResumeIndexOutOfRange {
                index: current_question_index,
                count,
            });
        }
        if let Some(answers) = answers {
            if answers.len() != count {
                return Err(SessionStateError::AnswerCountMismatch {
                    len: answers.len(),
                    count,
                });
            }
            self.answers = answers;
        }

        let current = self.answers[current_question_index];
        self.selected_option = if current.status.is_answered() {
            current.selected_answer.map(AnswerLetter::index)
        } else {
            None
        };
        self.session_id = Some(session_id);
        self.current_question_index = current_question_index;
        self.time_left = self.seconds_per_question;
        self.screen = Screen::InProgress;
        self.timer_paused = false;
        Ok(())
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<usize> {
        self.selected_option
    }

    #[must_use]
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn timer_paused(&self) -> bool {
        self.timer_paused
    }

    #[must_use]
    pub fn error(&self) -> Option<&ActionError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn results(&self) -> Option<&ResultsSummary> {
        self.results.as_ref()
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.screen == Screen::InProgress
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.screen == Screen::Results
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.answers.len()
    }

    /// True once an option has been locked for the current question.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.selected_option.is_some()
    }

    /// Seconds already spent on the current question.
    #[must_use]
    pub fn elapsed_on_current(&self) -> u32 {
        self.seconds_per_question.saturating_sub(self.time_left)
    }

    /// Button visibility derived from the current state.
    #[must_use]
    pub fn buttons(&self) -> ActionButtons {
        if self.screen != Screen::InProgress {
            return ActionButtons::default();
        }
        match (self.is_locked(), self.is_last_question()) {
            (false, _) => ActionButtons {
                skip: true,
                next: false,
                submit: false,
            },
            (true, false) => ActionButtons {
                skip: false,
                next: true,
                submit: false,
            },
            (true, true) => ActionButtons {
                skip: false,
                next: false,
                submit: true,
            },
        }
    }

    /// Lock `record` in as the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::AnswerLocked` if an option is already set.
    pub fn lock_answer(
        &mut self,
        option_index: usize,
        record: AnswerRecord,
    ) -> Result<(), SessionStateError> {
        self.ensure_in_progress()?;
        if self.is_locked() {
            return Err(SessionStateError::AnswerLocked {
                index: self.current_question_index,
            });
        }
        self.answers[self.current_question_index] = record;
        self.selected_option = Some(option_index);
        Ok(())
    }

    /// Record a skip for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::AnswerLocked` if an option is already set.
    pub fn record_skip(&mut self, time_spent: u32) -> Result<(), SessionStateError> {
        self.ensure_in_progress()?;
        if self.is_locked() {
            return Err(SessionStateError::AnswerLocked {
                index: self.current_question_index,
            });
        }
        self.answers[self.current_question_index] = AnswerRecord::skipped(time_spent);
        Ok(())
    }

    /// Move to the next question with a full timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NoNextQuestion` on the last question.
    pub fn advance(&mut self) -> Result<(), SessionStateError> {
        self.ensure_in_progress()?;
        if self.is_last_question() {
            return Err(SessionStateError::NoNextQuestion {
                index: self.current_question_index,
            });
        }
        self.current_question_index += 1;
        self.selected_option = None;
        self.time_left = self.seconds_per_question;
        self.timer_paused = false;
        self.error = None;
        Ok(())
    }

    /// Enter the terminal results screen.
    pub fn finish(&mut self, summary: ResultsSummary) {
        self.screen = Screen::Results;
        self.timer_paused = true;
        self.error = None;
        self.results = Some(summary);
    }

    /// Count the timer down by one second.
    ///
    /// Returns `true` when the countdown has reached zero.
    pub fn tick_down(&mut self) -> bool {
        self.time_left = self.time_left.saturating_sub(1);
        self.time_left == 0
    }

    pub fn pause_timer(&mut self) {
        self.timer_paused = true;
    }

    /// Resume the countdown; has no effect outside `in_progress`.
    pub fn resume_timer(&mut self) {
        if self.screen == Screen::InProgress {
            self.timer_paused = false;
        }
    }

    /// Flag a failed action and pause the timer.
    pub fn set_error(&mut self, action: SessionAction, message: impl Into<String>, clears_in: u32) {
        self.error = Some(ActionError {
            action,
            message: message.into(),
            clears_in,
        });
        self.timer_paused = true;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Count the pending error down by one tick.
    ///
    /// Returns `true` if an error was cleared by this tick.
    pub fn tick_error(&mut self) -> bool {
        let Some(error) = self.error.as_mut() else {
            return false;
        };
        error.clears_in = error.clears_in.saturating_sub(1);
        if error.clears_in == 0 {
            self.error = None;
            return true;
        }
        false
    }

    fn ensure_in_progress(&self) -> Result<(), SessionStateError> {
        if self.screen == Screen::InProgress {
            Ok(())
        } else {
            Err(SessionStateError::NotInProgress)
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn started(count: usize) -> SessionState {
        let mut state = SessionState::welcome(count, 30);
        state.begin(SessionId::generate(), 0, None).unwrap();
        state
    }

    #[test]
    fn welcome_has_no_session_and_paused_timer() {
        let state = SessionState::welcome(3, 30);
        assert_eq!(state.screen(), Screen::Welcome);
        assert!(state.session_id().is_none());
        assert!(state.timer_paused());
        assert_eq!(state.answers(), &[AnswerRecord::unanswered(); 3]);
        assert_eq!(state.buttons(), ActionButtons::default());
    }

    #[test]
    fn begin_starts_at_first_question_with_full_timer() {
        let state = started(3);
        assert_eq!(state.screen(), Screen::InProgress);
        assert_eq!(state.current_question_index(), 0);
        assert_eq!(state.time_left(), 30);
        assert!(!state.timer_paused());
        assert_eq!(
            state.buttons(),
            ActionButtons {
                skip: true,
                next: false,
                submit: false
            }
        );
    }

    #[test]
    fn second_lock_is_rejected() {
        let mut state = started(2);
        state
            .lock_answer(1, AnswerRecord::answered(AnswerLetter::B, true, 4))
            .unwrap();
        let before = state.clone();
        let err = state
            .lock_answer(2, AnswerRecord::answered(AnswerLetter::C, false, 5))
            .unwrap_err();
        assert_eq!(err, SessionStateError::AnswerLocked { index: 0 });
        assert_eq!(state, before);
    }

    #[test]
    fn skip_is_rejected_after_lock() {
        let mut state = started(2);
        state
            .lock_answer(0, AnswerRecord::answered(AnswerLetter::A, false, 1))
            .unwrap();
        assert!(state.record_skip(3).is_err());
    }

    #[test]
    fn buttons_follow_lock_and_position() {
        let mut state = started(2);
        state
            .lock_answer(0, AnswerRecord::answered(AnswerLetter::A, true, 1))
            .unwrap();
        assert_eq!(
            state.buttons(),
            ActionButtons {
                skip: false,
                next: true,
                submit: false
            }
        );

        state.advance().unwrap();
        state
            .lock_answer(3, AnswerRecord::answered(AnswerLetter::D, false, 2))
            .unwrap();
        assert_eq!(
            state.buttons(),
            ActionButtons {
                skip: false,
                next: false,
                submit: true
            }
        );
    }

    #[test]
    fn advance_resets_timer_and_selection() {
        let mut state = started(2);
        for _ in 0..12 {
            state.tick_down();
        }
        state
            .lock_answer(2, AnswerRecord::answered(AnswerLetter::C, true, 12))
            .unwrap();
        state.advance().unwrap();
        assert_eq!(state.time_left(), 30);
        assert_eq!(state.selected_option(), None);
        assert_eq!(state.current_question_index(), 1);
        assert_eq!(
            state.advance().unwrap_err(),
            SessionStateError::NoNextQuestion { index: 1 }
        );
    }

    #[test]
    fn begin_restores_lock_on_answered_current_question() {
        let mut state = SessionState::welcome(3, 20);
        let answers = vec![
            AnswerRecord::skipped(20),
            AnswerRecord::answered(AnswerLetter::C, false, 7),
            AnswerRecord::unanswered(),
        ];
        state.begin(SessionId::generate(), 1, Some(answers)).unwrap();
        assert_eq!(state.selected_option(), Some(2));
        assert_eq!(state.time_left(), 20);
        assert!(state.buttons().next);
    }

    #[test]
    fn begin_rejects_mismatched_resume_data() {
        let mut state = SessionState::welcome(2, 20);
        let err = state.begin(SessionId::generate(), 2, None).unwrap_err();
        assert_eq!(
            err,
            SessionStateError::ResumeIndexOutOfRange { index: 2, count: 2 }
        );

        let err = state
            .begin(SessionId::generate(), 0, Some(vec![AnswerRecord::unanswered()]))
            .unwrap_err();
        assert_eq!(err, SessionStateError::AnswerCountMismatch { len: 1, count: 2 });
        assert_eq!(state.screen(), Screen::Welcome);
    }

    #[test]
    fn error_clears_after_its_ticks() {
        let mut state = started(1);
        state.set_error(SessionAction::Skip, "offline", 2);
        assert!(state.timer_paused());
        assert!(!state.tick_error());
        assert!(state.error().is_some());
        assert!(state.tick_error());
        assert!(state.error().is_none());
    }

    #[test]
    fn tick_down_stops_at_zero() {
        let mut state = SessionState::welcome(1, 2);
        state.begin(SessionId::generate(), 0, None).unwrap();
        assert!(!state.tick_down());
        assert!(state.tick_down());
        assert!(state.tick_down());
        assert_eq!(state.time_left(), 0);
    }
}
