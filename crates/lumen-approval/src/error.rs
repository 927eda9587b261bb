/// Errors that can occur in the approval workflow.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// Storage backend error (lock poisoned, persistence failed, etc.).
    #[error("storage error: {0}")]
    Storage(String),

    /// Authorization file could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A risk level string did not name a known tier.
    #[error("invalid risk level: {0}")]
    InvalidRiskLevel(String),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
