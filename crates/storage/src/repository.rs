use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prep_core::model::{AnswerLetter, AnswerRecord, AnswerStatus, QuestionId, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }

    /// Parse the persisted representation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for unknown values.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(StorageError::Serialization(format!(
                "invalid session status: {s}"
            ))),
        }
    }
}

/// Persisted shape of one test attempt and its resume point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub test_slug: String,
    pub status: SessionStatus,
    pub current_question_index: u32,
    pub question_count: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// A fresh in-progress attempt positioned at the first question.
    #[must_use]
    pub fn start(
        id: SessionId,
        test_slug: impl Into<String>,
        question_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            test_slug: test_slug.into(),
            status: SessionStatus::InProgress,
            current_question_index: 0,
            question_count,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// One recorded answer or skip, keyed by `(session_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected_answer: Option<AnswerLetter>,
    pub is_correct: bool,
    pub is_skipped: bool,
    pub time_spent_secs: u32,
    pub recorded_at: DateTime<Utc>,
}

impl ResponseRecord {
    #[must_use]
    pub fn from_answer(
        session_id: SessionId,
        question_id: QuestionId,
        answer: &AnswerRecord,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            question_id,
            selected_answer: answer.selected_answer,
            is_correct: answer.status == AnswerStatus::Correct,
            is_skipped: answer.status == AnswerStatus::Skipped,
            time_spent_secs: answer.time_spent,
            recorded_at,
        }
    }

    /// Convert back into the domain answer entry.
    #[must_use]
    pub fn to_answer(&self) -> AnswerRecord {
        match (self.is_skipped, self.selected_answer) {
            (false, Some(letter)) => {
                AnswerRecord::answered(letter, self.is_correct, self.time_spent_secs)
            }
            _ => AnswerRecord::skipped(self.time_spent_secs),
        }
    }
}

/// Repository contract for test attempts.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists.
    async fn create_session(&self, record: &SessionRecord) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError>;

    /// Newest in-progress session for a test, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_open_session(&self, test_slug: &str)
    -> Result<Option<SessionRecord>, StorageError>;

    /// Move the resume point of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, `StorageError::Conflict` if
    /// the session is already completed.
    async fn update_progress(
        &self,
        id: SessionId,
        current_question_index: u32,
        status: SessionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Mark a session completed and return the stored record.
    ///
    /// Completing an already completed session keeps its original
    /// `completed_at` and returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn complete_session(
        &self,
        id: SessionId,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError>;
}

/// Repository contract for recorded responses.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Insert or replace the response for `(session_id, question_id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn upsert_response(&self, record: &ResponseRecord) -> Result<(), StorageError>;

    /// All responses recorded for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_responses(&self, session_id: SessionId)
    -> Result<Vec<ResponseRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
    responses: Arc<Mutex<HashMap<(SessionId, QuestionId), ResponseRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        if guard.contains_key(&record.id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn find_open_session(
        &self,
        test_slug: &str,
    ) -> Result<Option<SessionRecord>, StorageError> {
        let guard = self.sessions.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|s| s.test_slug == test_slug && s.status == SessionStatus::InProgress)
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn update_progress(
        &self,
        id: SessionId,
        current_question_index: u32,
        status: SessionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let record = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        if record.is_completed() {
            return Err(StorageError::Conflict);
        }
        record.current_question_index = current_question_index;
        record.status = status;
        record.updated_at = updated_at;
        if status == SessionStatus::Completed {
            record.completed_at = Some(updated_at);
        }
        Ok(())
    }

    async fn complete_session(
        &self,
        id: SessionId,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError> {
        let mut guard = self.sessions.lock().map_err(poisoned)?;
        let record = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        if !record.is_completed() {
            record.status = SessionStatus::Completed;
            record.updated_at = completed_at;
            record.completed_at = Some(completed_at);
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl ResponseRepository for InMemoryRepository {
    async fn upsert_response(&self, record: &ResponseRecord) -> Result<(), StorageError> {
        if !self
            .sessions
            .lock()
            .map_err(poisoned)?
            .contains_key(&record.session_id)
        {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.responses.lock().map_err(poisoned)?;
        guard.insert((record.session_id, record.question_id), record.clone());
        Ok(())
    }

    async fn list_responses(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        let guard = self.responses.lock().map_err(poisoned)?;
        let mut out: Vec<_> = guard
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.recorded_at, r.question_id));
        Ok(out)
    }
}

/// Aggregates session and response repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub responses: Arc<dyn ResponseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let responses: Arc<dyn ResponseRepository> = Arc::new(repo);
        Self {
            sessions,
            responses,
        }
    }
}
