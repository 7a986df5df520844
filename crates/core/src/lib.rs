#![forbid(unsafe_code)]

pub mod model;
pub mod scoring;
pub mod time;

pub use scoring::{QuestionDetail, ResultsSummary};
pub use time::Clock;
