//! Skill error types.

use thiserror::Error;

/// Errors a skill handler can return.
#[derive(Debug, Error)]
pub enum SkillError {
    /// The arguments did not match the skill's schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The skill ran and failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// A resource the skill needed was missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for skill execution.
pub type SkillResult<T> = Result<T, SkillError>;
