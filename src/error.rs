//! Error types for countdowns and story sequences

use thiserror::Error;

/// Errors raised when a countdown or story sequence cannot be built or started
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The tick interval must be strictly positive
    #[error("tick interval must be greater than zero")]
    ZeroInterval,

    /// A story sequence was asked to start at a story it does not have
    #[error("story {index} is out of range for a sequence of {count}")]
    StoryOutOfRange { index: usize, count: usize },

    /// The tokio scheduler was requested outside of a runtime
    #[error("no tokio runtime available: {reason}")]
    NoRuntime { reason: String },
}

pub type Result<T> = std::result::Result<T, TimerError>;
