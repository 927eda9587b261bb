//! Prelude module - commonly used types for convenient import.
//!
//! Use `use lumen_approval::prelude::*;` to import all essential types.

// Errors
pub use crate::{ApprovalError, ApprovalResult};

// Risk
pub use crate::{RiskClassifier, RiskLevel};

// Confirmation
pub use crate::{
    ConfirmationBroker, ConfirmationOutcome, ConfirmationRequest, ConfirmationResponse,
};

// Authorization
pub use crate::{
    Authorization, AuthorizationCheck, AuthorizationStore, FileAuthorizationStore,
    MemoryAuthorizationStore,
};
