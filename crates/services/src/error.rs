//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::model::{SessionId, SessionStateError};
use prep_core::scoring::ScoringError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `SessionBackend`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("test {found:?} is not served by this backend (expected {expected:?})")]
    UnknownTest { expected: String, found: String },
    #[error("session {0} is not completed")]
    NotCompleted(SessionId),
    #[error("question index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Fatal errors raised while starting a session.
///
/// Everything after a successful start is reported through the session state
/// instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("could not start session: {0}")]
    Init(#[source] BackendError),
    #[error("stored progress does not fit this test: {0}")]
    InvalidResume(#[from] SessionStateError),
}

/// The session runner task has stopped and accepts no more commands.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("session runner has stopped")]
pub struct RunnerClosed;

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
