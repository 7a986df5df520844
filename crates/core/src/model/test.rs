use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::answer::AnswerLetter;
use crate::model::ids::QuestionId;

/// Upper bound on questions in a single test.
pub const MAX_QUESTIONS: usize = 500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestDefinitionError {
    #[error("test slug cannot be empty")]
    EmptySlug,

    #[error("test name cannot be empty")]
    EmptyName,

    #[error("test has no questions")]
    NoQuestions,

    #[error("test has {len} questions (max {MAX_QUESTIONS})")]
    TooManyQuestions { len: usize },

    #[error("seconds per question must be > 0")]
    InvalidSecondsPerQuestion,

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("question {0} has an empty prompt")]
    EmptyPrompt(QuestionId),

    #[error("question {id} has {count} options (expected 4)")]
    InvalidOptionCount { id: QuestionId, count: usize },

    #[error("question {id} option {letter} is empty")]
    EmptyOption { id: QuestionId, letter: AnswerLetter },
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// Scope a test covers inside a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Topic,
    Module,
    Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives from a content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: AnswerLetter,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Unvalidated test definition, typically deserialized from JSON.
///
/// Call [`TestDefinitionDraft::validate`] to obtain a [`TestDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinitionDraft {
    pub slug: String,
    pub kind: TestKind,
    pub name: String,
    #[serde(default)]
    pub topic: String,
    pub difficulty: Difficulty,
    pub seconds_per_question: u32,
    pub questions: Vec<QuestionDraft>,
}

impl QuestionDraft {
    fn validate(self) -> Result<Question, TestDefinitionError> {
        if self.prompt.trim().is_empty() {
            return Err(TestDefinitionError::EmptyPrompt(self.id));
        }

        let options: [String; AnswerLetter::COUNT] =
            self.options
                .try_into()
                .map_err(|opts: Vec<String>| TestDefinitionError::InvalidOptionCount {
                    id: self.id,
                    count: opts.len(),
                })?;

        for (text, letter) in options.iter().zip(AnswerLetter::ALL) {
            if text.trim().is_empty() {
                return Err(TestDefinitionError::EmptyOption {
                    id: self.id,
                    letter,
                });
            }
        }

        Ok(Question {
            id: self.id,
            prompt: self.prompt,
            options,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty,
        })
    }
}

impl TestDefinitionDraft {
    /// Validate the draft into an immutable [`TestDefinition`].
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError` for empty identifiers, an empty or oversized
    /// question list, a zero timer, duplicate question ids, empty prompts or
    /// options, and option lists that do not hold exactly four entries.
    pub fn validate(self) -> Result<TestDefinition, TestDefinitionError> {
        let slug = self.slug.trim().to_owned();
        if slug.is_empty() {
            return Err(TestDefinitionError::EmptySlug);
        }
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(TestDefinitionError::EmptyName);
        }
        if self.seconds_per_question == 0 {
            return Err(TestDefinitionError::InvalidSecondsPerQuestion);
        }
        if self.questions.is_empty() {
            return Err(TestDefinitionError::NoQuestions);
        }
        if self.questions.len() > MAX_QUESTIONS {
            return Err(TestDefinitionError::TooManyQuestions {
                len: self.questions.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        let mut questions = Vec::with_capacity(self.questions.len());
        for draft in self.questions {
            if !seen.insert(draft.id) {
                return Err(TestDefinitionError::DuplicateQuestion(draft.id));
            }
            questions.push(draft.validate()?);
        }

        Ok(TestDefinition {
            slug,
            kind: self.kind,
            name,
            topic: self.topic.trim().to_owned(),
            difficulty: self.difficulty,
            seconds_per_question: self.seconds_per_question,
            questions,
        })
    }
}

//
// ─── VALIDATED TYPES ───────────────────────────────────────────────────────────
//

/// A multiple-choice question with exactly four options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: [String; AnswerLetter::COUNT],
    correct_answer: AnswerLetter,
    difficulty: Option<Difficulty>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// Rich-text prompt, possibly containing markup.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String; AnswerLetter::COUNT] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, letter: AnswerLetter) -> &str {
        &self.options[letter.index()]
    }

    #[must_use]
    pub fn correct_answer(&self) -> AnswerLetter {
        self.correct_answer
    }

    /// Per-question difficulty, if the content source set one.
    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }
}

/// Immutable, validated description of a timed test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    slug: String,
    kind: TestKind,
    name: String,
    topic: String,
    difficulty: Difficulty,
    seconds_per_question: u32,
    questions: Vec<Question>,
}

impl TestDefinition {
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn kind(&self) -> TestKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Position of a question in test order.
    #[must_use]
    pub fn position_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }

    /// Difficulty of a question, falling back to the test-wide difficulty.
    #[must_use]
    pub fn difficulty_of(&self, question: &Question) -> Difficulty {
        question.difficulty.unwrap_or(self.difficulty)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("Question {id}?"),
            options: vec!["one".into(), "two".into(), "three".into(), "four".into()],
            correct_answer: AnswerLetter::B,
            difficulty: None,
        }
    }

    fn draft(questions: Vec<QuestionDraft>) -> TestDefinitionDraft {
        TestDefinitionDraft {
            slug: "algebra-1".into(),
            kind: TestKind::Topic,
            name: "Algebra".into(),
            topic: "Linear equations".into(),
            difficulty: Difficulty::Medium,
            seconds_per_question: 30,
            questions,
        }
    }

    #[test]
    fn valid_draft_produces_definition() {
        let test = draft(vec![question(1), question(2)]).validate().unwrap();
        assert_eq!(test.slug(), "algebra-1");
        assert_eq!(test.question_count(), 2);
        assert_eq!(test.seconds_per_question(), 30);
        assert_eq!(test.position_of(QuestionId::new(2)), Some(1));
        assert_eq!(test.questions()[0].option(AnswerLetter::C), "three");
    }

    #[test]
    fn empty_question_list_is_rejected() {
        let err = draft(Vec::new()).validate().unwrap_err();
        assert_eq!(err, TestDefinitionError::NoQuestions);
    }

    #[test]
    fn zero_timer_is_rejected() {
        let mut d = draft(vec![question(1)]);
        d.seconds_per_question = 0;
        assert_eq!(
            d.validate().unwrap_err(),
            TestDefinitionError::InvalidSecondsPerQuestion
        );
    }

    #[test]
    fn option_count_must_be_four() {
        let mut q = question(7);
        q.options.pop();
        let err = draft(vec![q]).validate().unwrap_err();
        assert_eq!(
            err,
            TestDefinitionError::InvalidOptionCount {
                id: QuestionId::new(7),
                count: 3
            }
        );
    }

    #[test]
    fn blank_option_is_rejected() {
        let mut q = question(3);
        q.options[3] = "  ".into();
        let err = draft(vec![q]).validate().unwrap_err();
        assert_eq!(
            err,
            TestDefinitionError::EmptyOption {
                id: QuestionId::new(3),
                letter: AnswerLetter::D
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = draft(vec![question(1), question(1)]).validate().unwrap_err();
        assert_eq!(err, TestDefinitionError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn blank_slug_and_prompt_are_rejected() {
        let mut d = draft(vec![question(1)]);
        d.slug = " ".into();
        assert_eq!(d.validate().unwrap_err(), TestDefinitionError::EmptySlug);

        let mut q = question(4);
        q.prompt = String::new();
        let err = draft(vec![q]).validate().unwrap_err();
        assert_eq!(err, TestDefinitionError::EmptyPrompt(QuestionId::new(4)));
    }

    #[test]
    fn question_difficulty_falls_back_to_test() {
        let mut hard = question(2);
        hard.difficulty = Some(Difficulty::Hard);
        let test = draft(vec![question(1), hard]).validate().unwrap();
        assert_eq!(test.difficulty_of(&test.questions()[0]), Difficulty::Medium);
        assert_eq!(test.difficulty_of(&test.questions()[1]), Difficulty::Hard);
    }

    #[test]
    fn draft_deserializes_from_json() {
        let json = r#"{
            "slug": "geo",
            "kind": "section",
            "name": "Geometry",
            "difficulty": "easy",
            "seconds_per_question": 45,
            "questions": [
                {"id": 1, "prompt": "<p>Angles?</p>", "options": ["a","b","c","d"], "correct_answer": "D"}
            ]
        }"#;
        let draft: TestDefinitionDraft = serde_json::from_str(json).unwrap();
        let test = draft.validate().unwrap();
        assert_eq!(test.kind(), TestKind::Section);
        assert_eq!(test.topic(), "");
        assert_eq!(test.questions()[0].correct_answer(), AnswerLetter::D);
    }
}
