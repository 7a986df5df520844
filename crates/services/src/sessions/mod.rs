mod backend;
mod delay;
mod engine;
mod progress;
mod runner;
mod store;

// Public API of the session subsystem.
pub use crate::error::{BackendError, RunnerClosed, SessionError};
pub use backend::{ResponseSubmission, SessionBackend, SessionHandle};
pub use delay::{NoDelay, TokioDelay, TransitionDelay};
pub use engine::SessionEngine;
pub use progress::SessionProgress;
pub use runner::{LearnerAction, RunnerHandle, SessionCommand, SessionRunner, TICK};
pub use store::StoreBackend;
