//! Error types for event-nlp operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlpError {
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Schedule exhausted: {0}")]
    ScheduleExhausted(String),

    #[error("Non-monotonic projection: {0}")]
    NonMonotonicProjection(String),
}

pub type Result<T> = std::result::Result<T, NlpError>;
