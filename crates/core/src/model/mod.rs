mod answer;
mod ids;
mod session;
mod test;

pub use answer::{AnswerLetter, AnswerLetterError};
pub use ids::{ParseIdError, QuestionId, SessionId};
pub use session::{
    ActionButtons, ActionError, AnswerRecord, AnswerStatus, Screen, SessionAction, SessionState,
    SessionStateError,
};
pub use test::{
    Difficulty, MAX_QUESTIONS, Question, QuestionDraft, TestDefinition, TestDefinitionDraft,
    TestDefinitionError, TestKind,
};
