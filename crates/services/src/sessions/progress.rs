use prep_core::model::{AnswerStatus, SessionState};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub skipped: usize,
    pub remaining: usize,
    /// One-based position of the current question.
    pub current: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn from_state(state: &SessionState) -> Self {
        let total = state.question_count();
        let answered = state
            .answers()
            .iter()
            .filter(|a| a.status.is_answered())
            .count();
        let skipped = state
            .answers()
            .iter()
            .filter(|a| a.status == AnswerStatus::Skipped)
            .count();
        Self {
            total,
            answered,
            skipped,
            remaining: total - answered - skipped,
            current: (state.current_question_index() + 1).min(total),
            is_complete: state.is_complete(),
        }
    }
}
