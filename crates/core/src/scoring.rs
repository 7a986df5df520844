//! Results computation for a finished attempt.
//!
//! Everything here is a pure function of a [`TestDefinition`] and the
//! per-question [`AnswerRecord`]s, so the same summary can be rebuilt from
//! persisted responses at any time.

use scraper::Html;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnswerRecord, AnswerStatus, Difficulty, QuestionId, TestDefinition};

/// Maximum number of characters kept in a question snippet.
pub const SNIPPET_MAX_CHARS: usize = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("expected {expected} answers, got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },

    #[error("question {0} is not part of this test")]
    UnknownQuestion(QuestionId),
}

/// Per-question line of a results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question_id: QuestionId,
    pub snippet: String,
    pub status: AnswerStatus,
    pub difficulty: Difficulty,
    pub time: u32,
}

/// Aggregate statistics for a completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub question_count: u32,
    pub answered: u32,
    pub skipped: u32,
    pub correct: u32,
    pub wrong: u32,
    /// Whole-number percentage of answered questions that were correct.
    pub accuracy: u32,
    pub score: u32,
    pub total_time: u32,
    pub avg_time_per_question: f64,
    pub avg_time_per_correct_answer: f64,
    pub question_details: Vec<QuestionDetail>,
}

impl ResultsSummary {
    /// Compute the summary for `answers`, given in test order.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::AnswerCountMismatch` when `answers` does not hold
    /// exactly one entry per question.
    pub fn compute(test: &TestDefinition, answers: &[AnswerRecord]) -> Result<Self, ScoringError> {
        if answers.len() != test.question_count() {
            return Err(ScoringError::AnswerCountMismatch {
                expected: test.question_count(),
                actual: answers.len(),
            });
        }

        let mut correct = 0_u32;
        let mut wrong = 0_u32;
        let mut skipped = 0_u32;
        let mut total_time = 0_u32;
        let mut correct_time = 0_u32;

        for answer in answers {
            match answer.status {
                AnswerStatus::Correct => {
                    correct += 1;
                    correct_time = correct_time.saturating_add(answer.time_spent);
                }
                AnswerStatus::Wrong => wrong += 1,
                AnswerStatus::Skipped => skipped += 1,
                AnswerStatus::Unanswered => {}
            }
            total_time = total_time.saturating_add(answer.time_spent);
        }

        let answered = correct + wrong;
        let question_count = u32::try_from(answers.len()).unwrap_or(u32::MAX);

        let question_details = test
            .questions()
            .iter()
            .zip(answers)
            .map(|(question, answer)| QuestionDetail {
                question_id: question.id(),
                snippet: snippet(question.prompt()),
                status: answer.status,
                difficulty: test.difficulty_of(question),
                time: answer.time_spent,
            })
            .collect();

        Ok(Self {
            question_count,
            answered,
            skipped,
            correct,
            wrong,
            accuracy: accuracy(correct, answered),
            score: correct,
            total_time,
            avg_time_per_question: average(total_time, question_count),
            avg_time_per_correct_answer: average(correct_time, correct.max(1)),
            question_details,
        })
    }
}

/// Rebuild the answers array in test order from per-question records.
///
/// Questions without a record stay `unanswered`.
///
/// # Errors
///
/// Returns `ScoringError::UnknownQuestion` for a record whose question is not
/// part of `test`.
pub fn answers_in_test_order(
    test: &TestDefinition,
    records: impl IntoIterator<Item = (QuestionId, AnswerRecord)>,
) -> Result<Vec<AnswerRecord>, ScoringError> {
    let mut answers = vec![AnswerRecord::unanswered(); test.question_count()];
    for (id, record) in records {
        let position = test
            .position_of(id)
            .ok_or(ScoringError::UnknownQuestion(id))?;
        answers[position] = record;
    }
    Ok(answers)
}

/// Rounded percentage, half up; zero when nothing was answered.
#[must_use]
pub fn accuracy(correct: u32, answered: u32) -> u32 {
    if answered == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(answered));
    let answered = u64::from(answered);
    let pct = (correct * 200 + answered) / (answered * 2);
    u32::try_from(pct).unwrap_or(100)
}

fn average(total: u32, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    f64::from(total) / f64::from(count)
}

/// Plain-text preview of a rich-text prompt.
///
/// Markup tags are dropped, whitespace runs collapse to one space and the
/// result is cut to [`SNIPPET_MAX_CHARS`] characters with a `...` suffix.
#[must_use]
pub fn snippet(prompt: &str) -> String {
    let plain = plain_text(prompt);
    if plain.chars().count() <= SNIPPET_MAX_CHARS {
        return plain;
    }
    let mut out: String = plain.chars().take(SNIPPET_MAX_CHARS).collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}

/// Text content of a rich-text fragment with whitespace collapsed.
///
/// Entities are decoded and a bare `<` that does not open a tag is kept.
#[must_use]
pub fn plain_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
