#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod sessions;

pub use prep_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use config::EngineConfig;
pub use error::{AppServicesError, BackendError, RunnerClosed, SessionError};

pub use sessions::{
    LearnerAction, NoDelay, ResponseSubmission, RunnerHandle, SessionBackend, SessionCommand,
    SessionEngine, SessionHandle, SessionProgress, SessionRunner, StoreBackend, TokioDelay,
    TransitionDelay,
};
