//! Runtime error types.

use thiserror::Error;

/// Errors that can occur in the runtime.
///
/// Only precondition failures surface as errors from a run. Anything that goes
/// wrong after the `start` event becomes a run result with status `error`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The user message was empty.
    #[error("Message must not be empty")]
    EmptyMessage,

    /// The requested persona is not configured.
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    /// A run with the requested ID is already in flight.
    #[error("Run already in progress: {0}")]
    RunInProgress(lumen_core::RunId),

    /// LLM error.
    #[error("LLM error: {0}")]
    Llm(#[from] lumen_llm::LlmError),

    /// Storage error.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<lumen_approval::ApprovalError> for RuntimeError {
    fn from(err: lumen_approval::ApprovalError) -> Self {
        Self::StorageError(err.to_string())
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
