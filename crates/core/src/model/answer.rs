use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerLetterError {
    #[error("option index {0} is out of range (expected 0-3)")]
    IndexOutOfRange(usize),

    #[error("invalid answer letter: {0:?}")]
    InvalidLetter(String),
}

//
// ─── ANSWER LETTER ────────────────────────────────────────────────────────────
//

/// Letter label of one of the four options of a question.
///
/// Option positions map to letters in order: index 0 is `A`, 1 is `B`,
/// 2 is `C` and 3 is `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    /// Number of options every question carries.
    pub const COUNT: usize = 4;

    pub const ALL: [AnswerLetter; Self::COUNT] = [Self::A, Self::B, Self::C, Self::D];

    /// Maps a zero-based option index to its letter.
    ///
    /// # Errors
    ///
    /// Returns `AnswerLetterError::IndexOutOfRange` for indices above 3.
    pub fn from_index(index: usize) -> Result<Self, AnswerLetterError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(AnswerLetterError::IndexOutOfRange(index))
    }

    /// Zero-based option index of this letter.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            AnswerLetter::A => 0,
            AnswerLetter::B => 1,
            AnswerLetter::C => 2,
            AnswerLetter::D => 3,
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            AnswerLetter::A => 'A',
            AnswerLetter::B => 'B',
            AnswerLetter::C => 'C',
            AnswerLetter::D => 'D',
        }
    }

    /// Parses a letter, accepting lower case.
    ///
    /// # Errors
    ///
    /// Returns `AnswerLetterError::InvalidLetter` for anything outside A-D.
    pub fn from_char(c: char) -> Result<Self, AnswerLetterError> {
        match c.to_ascii_uppercase() {
            'A' => Ok(Self::A),
            'B' => Ok(Self::B),
            'C' => Ok(Self::C),
            'D' => Ok(Self::D),
            _ => Err(AnswerLetterError::InvalidLetter(c.to_string())),
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for AnswerLetter {
    type Err = AnswerLetterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Err(AnswerLetterError::InvalidLetter(trimmed.to_owned())),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
